use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Sibling of the metadata cache, `~/.azlin/connections.json`: records
/// last-connected timestamps keyed the same way, using the same
/// atomic-rename discipline.
pub struct ConnectionTracker {
    path: PathBuf,
}

impl ConnectionTracker {
    pub fn new(path: PathBuf) -> Self {
        ConnectionTracker { path }
    }

    pub fn open_default() -> Result<Self> {
        Ok(ConnectionTracker::new(azlin_core::paths::connections_path()?))
    }

    fn load(&self) -> BTreeMap<String, DateTime<Utc>> {
        std::fs::read(&self.path)
            .ok()
            .and_then(|b| serde_json::from_slice(&b).ok())
            .unwrap_or_default()
    }

    fn store(&self, map: &BTreeMap<String, DateTime<Utc>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            azlin_core::paths::ensure_private_dir(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(map).context("serializing connection tracker")?;
        azlin_core::atomic::write_atomic(&self.path, &bytes)
    }

    pub fn record_connected(&self, resource_group: &str, vm_name: &str) -> Result<()> {
        let mut map = self.load();
        map.insert(azlin_core::cache_key(resource_group, vm_name), Utc::now());
        self.store(&map)
    }

    pub fn last_connected(&self, resource_group: &str, vm_name: &str) -> Option<DateTime<Utc>> {
        self.load()
            .get(&azlin_core::cache_key(resource_group, vm_name))
            .copied()
    }

    /// True if the VM has been connected to at least once, consulted
    /// by the Orphan Governor's safety invariants before considering a
    /// resource for cleanup.
    pub fn has_connection_history(&self, resource_group: &str, vm_name: &str) -> bool {
        self.last_connected(resource_group, vm_name).is_some()
    }
}
