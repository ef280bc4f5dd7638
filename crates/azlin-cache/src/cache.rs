use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use azlin_core::time::is_expired;
use chrono::{Duration, Utc};

use crate::entry::{CacheLookup, ImmutableData, MutableData, VmCacheEntry};

/// `~/.azlin/vm_list_cache.json`. Each public method is a
/// load-modify-store round trip against the file; the cache is not
/// thread-safe in-memory and relies on the atomic rename to serialize
/// writers (last writer wins, acceptable for cache data).
pub struct VmMetadataCache {
    path: PathBuf,
}

impl VmMetadataCache {
    pub const IMMUTABLE_TTL: Duration = Duration::hours(24);
    pub const MUTABLE_TTL: Duration = Duration::minutes(5);
    pub const TMUX_TTL: Duration = Duration::minutes(5);

    pub fn new(path: PathBuf) -> Self {
        VmMetadataCache { path }
    }

    pub fn open_default() -> Result<Self> {
        Ok(VmMetadataCache::new(azlin_core::paths::cache_path()?))
    }

    fn load(&self) -> BTreeMap<String, VmCacheEntry> {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return BTreeMap::new();
        };
        let _ = azlin_core::paths::ensure_private_file_mode(&self.path);
        match serde_json::from_slice::<BTreeMap<String, serde_json::Value>>(&bytes) {
            Ok(raw_map) => {
                let mut map = BTreeMap::new();
                for (k, v) in raw_map {
                    match serde_json::from_value::<VmCacheEntry>(v) {
                        Ok(entry) => {
                            map.insert(k, entry);
                        }
                        Err(e) => {
                            tracing::warn!(key = %k, error = %e, "skipping malformed cache entry");
                        }
                    }
                }
                map
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "cache file malformed, degrading to empty cache");
                BTreeMap::new()
            }
        }
    }

    fn store(&self, map: &BTreeMap<String, VmCacheEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            azlin_core::paths::ensure_private_dir(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(map).context("serializing cache")?;
        azlin_core::atomic::write_atomic(&self.path, &bytes)
    }

    pub fn get(&self, resource_group: &str, vm_name: &str) -> Option<CacheLookup> {
        let map = self.load();
        let key = azlin_core::cache_key(resource_group, vm_name);
        let entry = map.get(&key)?.clone();
        Some(self.annotate(entry))
    }

    fn annotate(&self, entry: VmCacheEntry) -> CacheLookup {
        CacheLookup {
            immutable_expired: is_expired(entry.immutable_ts, Self::IMMUTABLE_TTL),
            mutable_expired: is_expired(entry.mutable_ts, Self::MUTABLE_TTL),
            tmux_expired: is_expired(entry.tmux_ts, Self::TMUX_TTL),
            entry,
        }
    }

    pub fn get_by_resource_group(&self, resource_group: &str) -> Vec<CacheLookup> {
        let map = self.load();
        map.into_values()
            .filter(|e| e.resource_group == resource_group)
            .map(|e| self.annotate(e))
            .collect()
    }

    pub fn set_immutable(&self, resource_group: &str, vm_name: &str, data: ImmutableData) -> Result<()> {
        let mut map = self.load();
        let key = azlin_core::cache_key(resource_group, vm_name);
        let entry = map
            .entry(key)
            .or_insert_with(|| VmCacheEntry::new(resource_group, vm_name));
        entry.immutable = Some(data);
        entry.immutable_ts = Some(Utc::now());
        self.store(&map)
    }

    pub fn set_mutable(&self, resource_group: &str, vm_name: &str, data: MutableData) -> Result<()> {
        let mut map = self.load();
        let key = azlin_core::cache_key(resource_group, vm_name);
        let entry = map
            .entry(key)
            .or_insert_with(|| VmCacheEntry::new(resource_group, vm_name));
        entry.mutable = Some(data);
        entry.mutable_ts = Some(Utc::now());
        self.store(&map)
    }

    /// Writes both tiers in one round trip; prefer this over
    /// `set_immutable`+`set_mutable` when the caller needs both
    /// written consistently under concurrent writers.
    pub fn set_full(&self, resource_group: &str, vm_name: &str, immutable: ImmutableData, mutable: MutableData) -> Result<()> {
        let mut map = self.load();
        let key = azlin_core::cache_key(resource_group, vm_name);
        let now = Utc::now();
        let entry = map
            .entry(key)
            .or_insert_with(|| VmCacheEntry::new(resource_group, vm_name));
        entry.immutable = Some(immutable);
        entry.immutable_ts = Some(now);
        entry.mutable = Some(mutable);
        entry.mutable_ts = Some(now);
        self.store(&map)
    }

    pub fn set_tmux(&self, resource_group: &str, vm_name: &str, sessions: Vec<String>) -> Result<()> {
        let mut map = self.load();
        let key = azlin_core::cache_key(resource_group, vm_name);
        let entry = map
            .entry(key)
            .or_insert_with(|| VmCacheEntry::new(resource_group, vm_name));
        entry.tmux_sessions = sessions;
        entry.tmux_ts = Some(Utc::now());
        self.store(&map)
    }

    pub fn delete(&self, resource_group: &str, vm_name: &str) -> Result<()> {
        let mut map = self.load();
        map.remove(&azlin_core::cache_key(resource_group, vm_name));
        self.store(&map)
    }

    pub fn clear(&self) -> Result<()> {
        self.store(&BTreeMap::new())
    }

    /// Removes entries where *both* tiers (immutable, mutable) are
    /// expired; any still-valid tier keeps the entry. The tmux tier is
    /// excluded from this decision — it is session metadata, not
    /// identity.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let mut map = self.load();
        let before = map.len();
        map.retain(|_, e| {
            !(is_expired(e.immutable_ts, Self::IMMUTABLE_TTL) && is_expired(e.mutable_ts, Self::MUTABLE_TTL))
        });
        let removed = before - map.len();
        self.store(&map)?;
        Ok(removed)
    }
}

pub fn cache_path_for_test(dir: &Path) -> PathBuf {
    dir.join("vm_list_cache.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immutable() -> ImmutableData {
        ImmutableData {
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2204".into(),
            created_at: Utc::now(),
            tags: Default::default(),
        }
    }

    fn mutable() -> MutableData {
        MutableData {
            power_state: azlin_core::PowerState::Running,
            public_ip: Some("1.2.3.4".into()),
            private_ip: None,
            provisioning_state: "Succeeded".into(),
        }
    }

    #[test]
    fn set_immutable_leaves_mutable_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(cache_path_for_test(tmp.path()));
        cache.set_immutable("rg", "vm1", immutable()).unwrap();
        let lookup = cache.get("rg", "vm1").unwrap();
        assert!(lookup.entry.immutable.is_some());
        assert!(lookup.entry.mutable.is_none());
        assert!(lookup.mutable_expired);
    }

    #[test]
    fn set_full_marks_both_tiers_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(cache_path_for_test(tmp.path()));
        cache.set_full("rg", "vm1", immutable(), mutable()).unwrap();
        let lookup = cache.get("rg", "vm1").unwrap();
        assert!(!lookup.immutable_expired);
        assert!(!lookup.mutable_expired);
        assert!(azlin_core::time::is_fresh(lookup.entry.immutable_ts.unwrap()));
        assert!(azlin_core::time::is_fresh(lookup.entry.mutable_ts.unwrap()));
    }

    #[test]
    fn cleanup_expired_preserves_entries_with_one_fresh_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(cache_path_for_test(tmp.path()));
        cache.set_immutable("rg", "fresh-immutable", immutable()).unwrap();

        // Simulate an entry with both tiers expired by writing directly.
        let mut map: BTreeMap<String, VmCacheEntry> = BTreeMap::new();
        let mut stale = VmCacheEntry::new("rg", "stale");
        stale.immutable = Some(immutable());
        stale.immutable_ts = Some(Utc::now() - Duration::hours(25));
        stale.mutable = Some(mutable());
        stale.mutable_ts = Some(Utc::now() - Duration::minutes(6));
        map.insert(stale.key(), stale);
        let loaded = cache.load();
        for (k, v) in loaded {
            map.insert(k, v);
        }
        cache.store(&map).unwrap();

        let removed = cache.cleanup_expired().unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("rg", "fresh-immutable").is_some());
        assert!(cache.get("rg", "stale").is_none());
    }

    #[test]
    fn malformed_file_degrades_to_empty_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let path = cache_path_for_test(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json at all").unwrap();
        let cache = VmMetadataCache::new(path);
        assert!(cache.get("rg", "anything").is_none());
    }

    #[test]
    fn delete_removes_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(cache_path_for_test(tmp.path()));
        cache.set_immutable("rg", "vm1", immutable()).unwrap();
        cache.delete("rg", "vm1").unwrap();
        assert!(cache.get("rg", "vm1").is_none());
    }

    #[test]
    fn get_by_resource_group_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(cache_path_for_test(tmp.path()));
        cache.set_immutable("rg1", "vm1", immutable()).unwrap();
        cache.set_immutable("rg2", "vm2", immutable()).unwrap();
        let results = cache.get_by_resource_group("rg1");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.vm_name, "vm1");
    }
}
