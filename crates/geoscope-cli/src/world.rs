//! # Snapshot Runtime
//!
//! Builds an [`AccessService`] from one snapshot file holding both the
//! geography tables and the actor table.
//!
//! ```yaml
//! geography:
//!   regions:   [{ id: 4, name: "Region IV-A" }]
//!   divisions: [{ id: 17, name: "Batangas", region_id: 4 }]
//! actors:
//!   - { id: 1, username: co-admin, email: admin@deped.gov.ph, admin_level: central }
//!   - { id: 2, username: rd4, email: rd4@deped.gov.ph, admin_level: region, region_id: 4 }
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use geoscope_audit::{AuditRecorder, AuditSink, JsonlAuditLog, MemoryAuditLog};
use geoscope_directory::{load_directory, ActorSeed};
use geoscope_geo::GeoSnapshot;
use geoscope_policy::{AccessEngine, AccessService};
use serde::{Deserialize, Serialize};

use crate::config::CliConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub geography: GeoSnapshot,
    #[serde(default)]
    pub actors: Vec<ActorSeed>,
}

impl WorldSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
    }
}

/// Open the configured audit sink: the JSON-lines log when configured,
/// otherwise an in-memory log discarded on exit.
pub fn open_sink(config: &CliConfig) -> Result<Arc<dyn AuditSink>> {
    match &config.audit_log {
        Some(path) => {
            let log = JsonlAuditLog::open(path)
                .with_context(|| format!("opening audit log {}", path.display()))?;
            Ok(Arc::new(log))
        }
        None => Ok(Arc::new(MemoryAuditLog::new())),
    }
}

/// Load the snapshot named by `config` and wire up the service.
pub fn build_service(config: &CliConfig) -> Result<AccessService> {
    let path = config.snapshot.as_deref().with_context(|| {
        format!(
            "no snapshot configured: pass --snapshot, set {} or add `snapshot:` to the config file",
            crate::config::ENV_SNAPSHOT
        )
    })?;
    let world = WorldSnapshot::load(path)?;
    let hierarchy = world
        .geography
        .into_hierarchy()
        .with_context(|| format!("invalid geography in {}", path.display()))?;
    let directory = load_directory(world.actors)
        .with_context(|| format!("invalid actor table in {}", path.display()))?;
    let (regions, divisions, districts, schools) = hierarchy.counts();
    tracing::info!(
        snapshot = %path.display(),
        regions,
        divisions,
        districts,
        schools,
        actors = directory.len(),
        "snapshot loaded"
    );
    let engine = AccessEngine::new(
        Arc::new(hierarchy),
        Arc::new(directory),
        AuditRecorder::new(open_sink(config)?),
    );
    Ok(AccessService::new(engine))
}
