//! # Audit Subcommands
//!
//! - `geoscope audit verify [--path FILE]`: check the hash chain. Exits 2
//!   at the first broken link.
//! - `geoscope audit tail [-n N] [--actor ID] [--action TAG]`: print the
//!   most recent matching events, one JSON object per line.
//!
//! The log path defaults to the configured `audit_log`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use geoscope_audit::{read_events, verify_chain, AuditError, AuditEvent};
use geoscope_core::ActorId;
use serde_json::json;

use crate::config::CliConfig;
use crate::evaluate::{Outcome, EXIT_ALLOW, EXIT_DENY};

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Verify the audit log's hash chain.
    Verify {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the most recent events.
    Tail {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        #[arg(long)]
        actor: Option<ActorId>,
        #[arg(long)]
        action: Option<String>,
    },
}

fn log_path<'a>(flag: Option<&'a Path>, config: &'a CliConfig) -> Result<&'a Path> {
    flag.or(config.audit_log.as_deref())
        .context("no audit log configured: pass --path, --audit-log or set GEOSCOPE_AUDIT_LOG")
}

pub fn verify(path: &Path) -> Result<Outcome> {
    let events =
        read_events(path).with_context(|| format!("reading audit log {}", path.display()))?;
    match verify_chain(&events) {
        Ok(()) => {
            let head = events.last().map(|e| e.digest.to_hex());
            Ok(Outcome {
                body: json!({ "valid": true, "events": events.len(), "head": head }),
                code: EXIT_ALLOW,
            })
        }
        Err(AuditError::ChainBroken { sequence, reason }) => {
            tracing::warn!(sequence, reason = %reason, "audit chain broken");
            Ok(Outcome {
                body: json!({ "valid": false, "sequence": sequence, "reason": reason }),
                code: EXIT_DENY,
            })
        }
        Err(e) => Err(e).context("verifying audit log"),
    }
}

pub fn tail(
    path: &Path,
    count: usize,
    actor: Option<ActorId>,
    action: Option<&str>,
) -> Result<Vec<AuditEvent>> {
    let events =
        read_events(path).with_context(|| format!("reading audit log {}", path.display()))?;
    let matching: Vec<AuditEvent> = events
        .into_iter()
        .filter(|e| actor.map_or(true, |a| e.actor_id == a))
        .filter(|e| action.map_or(true, |a| e.action == a))
        .collect();
    let start = matching.len().saturating_sub(count);
    Ok(matching[start..].to_vec())
}

pub fn run_audit(args: &AuditArgs, config: &CliConfig) -> Result<u8> {
    match &args.command {
        AuditCommand::Verify { path } => {
            let out = verify(log_path(path.as_deref(), config)?)?;
            crate::emit(&out.body, config.output)?;
            Ok(out.code)
        }
        AuditCommand::Tail {
            path,
            count,
            actor,
            action,
        } => {
            let events = tail(log_path(path.as_deref(), config)?, *count, *actor, action.as_deref())?;
            for event in &events {
                println!("{}", serde_json::to_string(event)?);
            }
            Ok(EXIT_ALLOW)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscope_audit::{AuditEntry, AuditSink, JsonlAuditLog};

    fn write_log(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("audit.jsonl");
        let log = JsonlAuditLog::open(&path).unwrap();
        for (actor, action) in [(1, "actor.create"), (2, "deadline.create"), (1, "actor.update")] {
            log.append(AuditEntry::new(ActorId::new(actor).unwrap(), action, "user"))
                .unwrap();
        }
        path
    }

    #[test]
    fn verify_intact_log() {
        let dir = tempfile::tempdir().unwrap();
        let out = verify(&write_log(&dir)).unwrap();
        assert_eq!(out.code, EXIT_ALLOW);
        assert_eq!(out.body["events"], 3);
    }

    #[test]
    fn verify_reports_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(&dir);
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replacen("deadline.create", "deadline.delete", 1)).unwrap();
        let out = verify(&path).unwrap();
        assert_eq!(out.code, EXIT_DENY);
        assert_eq!(out.body["sequence"], 2);
    }

    #[test]
    fn tail_filters_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(&dir);
        let by_actor = tail(&path, 10, Some(ActorId::new(1).unwrap()), None).unwrap();
        assert_eq!(by_actor.len(), 2);
        let last = tail(&path, 1, None, None).unwrap();
        assert_eq!(last[0].action, "actor.update");
        assert!(tail(&path, 5, None, Some("actor.delete")).unwrap().is_empty());
    }

    #[test]
    fn missing_log_path_is_an_error() {
        assert!(log_path(None, &CliConfig::default()).is_err());
    }
}
