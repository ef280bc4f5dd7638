use std::collections::BTreeMap;

use azlin_core::PowerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImmutableData {
    pub region: String,
    pub size: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MutableData {
    pub power_state: PowerState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub provisioning_state: String,
}

/// Wraps a VM Record with three independently-expiring tiers. `None`
/// on a `*_ts` field means that tier was never populated, which is
/// always treated as expired (see `azlin_core::time::is_expired`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VmCacheEntry {
    pub vm_name: String,
    pub resource_group: String,
    pub immutable: Option<ImmutableData>,
    pub immutable_ts: Option<DateTime<Utc>>,
    pub mutable: Option<MutableData>,
    pub mutable_ts: Option<DateTime<Utc>>,
    pub tmux_sessions: Vec<String>,
    pub tmux_ts: Option<DateTime<Utc>>,
}

impl VmCacheEntry {
    pub fn new(resource_group: impl Into<String>, vm_name: impl Into<String>) -> Self {
        VmCacheEntry {
            vm_name: vm_name.into(),
            resource_group: resource_group.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        azlin_core::cache_key(&self.resource_group, &self.vm_name)
    }
}

/// Entry annotated with per-tier expiry, returned by `Get`.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: VmCacheEntry,
    pub immutable_expired: bool,
    pub mutable_expired: bool,
    pub tmux_expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        let e = VmCacheEntry::new("rg", "vm1");
        assert_eq!(e.key(), "rg:vm1");
    }

    #[test]
    fn default_entry_has_no_tiers_populated() {
        let e = VmCacheEntry::new("rg", "vm1");
        assert!(e.immutable.is_none());
        assert!(e.immutable_ts.is_none());
        assert!(e.mutable.is_none());
        assert!(e.tmux_sessions.is_empty());
    }
}
