// Snapshot store - persists enriched gateways as JSON and serves them back as a topology source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::RouterResult;
use crate::gateway::Gateway;
use crate::topology::{AttachmentSummary, InMemoryTopology};

/// Gateways as they were at `taken_at`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub taken_at: DateTime<Utc>,
    pub gateways: Vec<Gateway>,
}

impl GatewaySnapshot {
    pub fn new(gateways: Vec<Gateway>) -> Self {
        GatewaySnapshot {
            taken_at: Utc::now(),
            gateways,
        }
    }

    /// Topology that reproduces the snapshot when fetched again.
    ///
    /// Associations come from each route table's attachments. Tables whose
    /// routes were never loaded keep failing their route fetch.
    pub fn to_topology(&self) -> InMemoryTopology {
        let mut topology = InMemoryTopology::new();
        for gw in &self.gateways {
            topology = topology.with_gateway(&gw.id, &gw.name);
            for rt in &gw.route_tables {
                topology = topology.with_route_table(&gw.id, &rt.id, &rt.name);
                if !rt.routes_loaded {
                    topology = topology.fail_routes_for(&rt.id);
                }
                for route in &rt.routes {
                    topology = topology.with_route(&rt.id, route.clone());
                }
                for att in &rt.attachments {
                    let mut summary =
                        AttachmentSummary::new(&att.id, &gw.id, &att.resource_id, &att.resource_type)
                            .associated_with(&rt.id);
                    if let Some(name) = &att.name {
                        summary = summary.named(name);
                    }
                    topology = topology.with_attachment(summary);
                }
            }
        }
        topology
    }
}

/// One snapshot file per database name, `<db_name>_tgw.json` under `dir`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    db_name: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, db_name: impl Into<String>) -> Self {
        SnapshotStore {
            dir: dir.into(),
            db_name: db_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}_tgw.json", self.db_name))
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Write `gateways` as a new snapshot, replacing the previous one.
    pub fn save(&self, gateways: &[Gateway]) -> RouterResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let snapshot = GatewaySnapshot::new(gateways.to_vec());
        let path = self.path();

        // Write then rename so a crash never leaves a truncated snapshot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&snapshot)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::info!(
            "Saved {} gateway(s) to {} at {}",
            snapshot.gateways.len(),
            path.display(),
            snapshot.taken_at.to_rfc3339()
        );
        Ok(path)
    }

    pub fn load(&self) -> RouterResult<GatewaySnapshot> {
        load_snapshot(&self.path())
    }
}

pub fn load_snapshot(path: &Path) -> RouterResult<GatewaySnapshot> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: GatewaySnapshot = serde_json::from_str(&content)?;
    tracing::debug!(
        "Loaded snapshot from {} taken at {}",
        path.display(),
        snapshot.taken_at.to_rfc3339()
    );
    Ok(snapshot)
}
