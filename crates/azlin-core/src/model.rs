use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable power state of a VM. `Deallocated` is cloud-specific
/// "stopped and not billed"; `Stopped` still incurs compute cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Running,
    Stopped,
    Deallocated,
    Starting,
    Stopping,
    Unknown,
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PowerState::Running => "running",
            PowerState::Stopped => "stopped",
            PowerState::Deallocated => "deallocated",
            PowerState::Starting => "starting",
            PowerState::Stopping => "stopping",
            PowerState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Identity is `(resource_group, name)`. Fields are split between the
/// immutable-after-create half and the mutable half so the cache can
/// track them on independent TTLs (see `azlin-cache`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmRecord {
    pub name: String,
    pub resource_group: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub tags: std::collections::BTreeMap<String, String>,
    pub power_state: PowerState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub provisioning_state: String,
}

impl VmRecord {
    pub fn cache_key(&self) -> String {
        cache_key(&self.resource_group, &self.name)
    }

    /// A running VM lacking both IPs is a driver bug; the cache must
    /// reject such a record rather than silently caching bad data.
    pub fn is_cacheable(&self) -> bool {
        if self.power_state == PowerState::Running {
            return self.public_ip.is_some() || self.private_ip.is_some();
        }
        true
    }
}

pub fn cache_key(resource_group: &str, name: &str) -> String {
    format!("{resource_group}:{name}")
}

/// `(vm_name, vm_rg) -> (bastion_name, bastion_rg, enabled)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BastionMapping {
    pub vm_name: String,
    pub vm_resource_group: String,
    pub bastion_name: String,
    pub bastion_resource_group: String,
    pub enabled: bool,
}

/// Ephemeral, never persisted — constructed fresh for each `connect`.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub private_key_path: PathBuf,
    pub jump_via_bastion_tunnel: Option<PortAllocation>,
}

/// A local TCP port in `[50000, 60000]` bound to `127.0.0.1` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocation {
    pub port: u16,
}

impl PortAllocation {
    pub const RANGE_START: u16 = 50000;
    pub const RANGE_END: u16 = 60000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelState {
    Spawning,
    Ready,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaScope {
    Vm,
    Team,
    Project,
}

impl std::fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuotaScope::Vm => "vm",
            QuotaScope::Team => "team",
            QuotaScope::Project => "project",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub scope: QuotaScope,
    pub name: String,
    pub quota_gb: i64,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used_gb: i64,
    pub available_gb: i64,
    pub utilization_percent: f64,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaCheck {
    pub available: bool,
    pub remaining_after_gb: i64,
}

/// Tagged union of the three orphan kinds, each carrying its own
/// back-reference shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrphanReport {
    Disk {
        id: String,
        size_gb: i64,
        age_days: i64,
        monthly_cost: f64,
        reason: String,
        last_attached_vm: Option<String>,
    },
    Snapshot {
        id: String,
        size_gb: i64,
        age_days: i64,
        monthly_cost: f64,
        reason: String,
        source_vm: String,
    },
    Storage {
        id: String,
        size_gb: i64,
        age_days: i64,
        monthly_cost: f64,
        reason: String,
        connected_vms: Vec<String>,
    },
}

impl OrphanReport {
    pub fn id(&self) -> &str {
        match self {
            OrphanReport::Disk { id, .. }
            | OrphanReport::Snapshot { id, .. }
            | OrphanReport::Storage { id, .. } => id,
        }
    }

    pub fn monthly_cost(&self) -> f64 {
        match self {
            OrphanReport::Disk { monthly_cost, .. }
            | OrphanReport::Snapshot { monthly_cost, .. }
            | OrphanReport::Storage { monthly_cost, .. } => *monthly_cost,
        }
    }

    pub fn size_gb(&self) -> i64 {
        match self {
            OrphanReport::Disk { size_gb, .. }
            | OrphanReport::Snapshot { size_gb, .. }
            | OrphanReport::Storage { size_gb, .. } => *size_gb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record(state: PowerState, public_ip: Option<&str>, private_ip: Option<&str>) -> VmRecord {
        VmRecord {
            name: "vm1".into(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: "Standard_D2s_v3".into(),
            image: "ubuntu-22.04".into(),
            created_at: Utc::now(),
            tags: Default::default(),
            power_state: state,
            public_ip: public_ip.map(String::from),
            private_ip: private_ip.map(String::from),
            provisioning_state: "Succeeded".into(),
        }
    }

    #[test]
    fn running_without_ips_is_not_cacheable() {
        let r = base_record(PowerState::Running, None, None);
        assert!(!r.is_cacheable());
    }

    #[test]
    fn running_with_private_ip_is_cacheable() {
        let r = base_record(PowerState::Running, None, Some("10.0.0.4"));
        assert!(r.is_cacheable());
    }

    #[test]
    fn stopped_without_ips_is_cacheable() {
        let r = base_record(PowerState::Deallocated, None, None);
        assert!(r.is_cacheable());
    }

    #[test]
    fn cache_key_format() {
        let r = base_record(PowerState::Stopped, None, None);
        assert_eq!(r.cache_key(), "rg:vm1");
    }
}
