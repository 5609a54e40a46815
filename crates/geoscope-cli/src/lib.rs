//! # geoscope-cli — Command-Line Front End
//!
//! Evaluates access decisions against an exported snapshot so operators
//! can answer "why was this user denied?" without the web application,
//! and verifies audit logs.
//!
//! ## Subcommands
//!
//! - `geoscope scope`: resolved scope of an actor.
//! - `geoscope can-create`, `can-access`, `check`, `deadline`: one gate each.
//! - `geoscope defaults`: the level default permission table.
//! - `geoscope audit verify` / `audit tail`: audit log inspection.

pub mod audit_log;
pub mod config;
pub mod evaluate;
pub mod world;

use anyhow::Result;
use serde::Serialize;

use crate::config::OutputFormat;

/// Print a JSON body to stdout in the configured format.
pub fn emit(body: &impl Serialize, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(body)?,
        OutputFormat::Compact => serde_json::to_string(body)?,
    };
    println!("{text}");
    Ok(())
}
