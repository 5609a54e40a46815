//! # geoscope CLI entry point
//!
//! Parses arguments, layers configuration, and dispatches to subcommand
//! handlers. Logs go to stderr; results go to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use geoscope_cli::audit_log::{run_audit, AuditArgs};
use geoscope_cli::config::{CliConfig, OutputFormat};
use geoscope_cli::evaluate::{
    self, CanAccessArgs, CanCreateArgs, CheckArgs, DeadlineArgs, DefaultsArgs, Outcome, ScopeArgs,
};
use geoscope_cli::world::build_service;

/// Geographic access control for the education reporting platform.
///
/// Evaluates scope, creation, management, resource and deadline decisions
/// against a geography and actor snapshot.
#[derive(Parser, Debug)]
#[command(name = "geoscope", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file (overrides config and GEOSCOPE_SNAPSHOT).
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Audit log file (overrides config and GEOSCOPE_AUDIT_LOG).
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Result output format.
    #[arg(long, global = true)]
    output: Option<OutputFormat>,

    /// Log line format on stderr.
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an actor's accessible scope.
    Scope(ScopeArgs),

    /// May an actor create an account at a level and location?
    CanCreate(CanCreateArgs),

    /// May an actor see or manage another actor?
    CanAccess(CanAccessArgs),

    /// May an actor act on a resource at a location? Audited.
    Check(CheckArgs),

    /// May an actor set a deadline for a region, division or district?
    Deadline(DeadlineArgs),

    /// Print the default permission flags per admin level.
    Defaults(DefaultsArgs),

    /// Verify or inspect the audit log.
    Audit(AuditArgs),
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    tracing::debug!("geoscope CLI v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = CliConfig::load(cli.config.as_deref())?
        .apply_env(|key| std::env::var(key).ok())
        .apply_flags(cli.snapshot, cli.audit_log, cli.output);

    let outcome: Outcome = match &cli.command {
        Commands::Defaults(args) => evaluate::defaults(args)?,
        Commands::Audit(args) => return run_audit(args, &config),
        Commands::Scope(args) => evaluate::scope(args, &build_service(&config)?)?,
        Commands::CanCreate(args) => evaluate::can_create(args, &build_service(&config)?)?,
        Commands::CanAccess(args) => evaluate::can_access(args, &build_service(&config)?)?,
        Commands::Check(args) => evaluate::check(args, &build_service(&config)?)?,
        Commands::Deadline(args) => evaluate::deadline(args, &build_service(&config)?)?,
    };
    geoscope_cli::emit(&outcome.body, config.output)?;
    Ok(outcome.code)
}
