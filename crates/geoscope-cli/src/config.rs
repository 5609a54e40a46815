//! # CLI Configuration
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. the YAML file named by `--config`,
//! 2. `GEOSCOPE_SNAPSHOT` / `GEOSCOPE_AUDIT_LOG`,
//! 3. the `--snapshot` / `--audit-log` flags.
//!
//! ```yaml
//! snapshot: /srv/geoscope/snapshot.yaml
//! audit_log: /var/log/geoscope/audit.jsonl
//! output: pretty
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_SNAPSHOT: &str = "GEOSCOPE_SNAPSHOT";
pub const ENV_AUDIT_LOG: &str = "GEOSCOPE_AUDIT_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Combined geography and actor snapshot.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    /// JSON-lines audit log. Decisions are audited in memory only when
    /// unset.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputFormat,
}

impl CliConfig {
    /// Read the config file, or start from defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in the
    /// binary.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_SNAPSHOT).filter(|v| !v.is_empty()) {
            self.snapshot = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_AUDIT_LOG).filter(|v| !v.is_empty()) {
            self.audit_log = Some(PathBuf::from(path));
        }
        self
    }

    /// Apply command-line overrides.
    pub fn apply_flags(
        mut self,
        snapshot: Option<PathBuf>,
        audit_log: Option<PathBuf>,
        output: Option<OutputFormat>,
    ) -> Self {
        if snapshot.is_some() {
            self.snapshot = snapshot;
        }
        if audit_log.is_some() {
            self.audit_log = audit_log;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }
}
