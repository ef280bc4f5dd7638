use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// `~/.azlin/config.toml` — defaults consulted by the CLI and
/// Lifecycle Orchestrator when a flag is not given explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzlinConfig {
    pub default_resource_group: Option<String>,
    pub default_region: Option<String>,
    pub default_vm_size: Option<String>,
    pub sessions: std::collections::BTreeMap<String, String>,
    pub provision: ProvisionConfig,
}

impl Default for AzlinConfig {
    fn default() -> Self {
        AzlinConfig {
            default_resource_group: None,
            default_region: None,
            default_vm_size: None,
            sessions: Default::default(),
            provision: ProvisionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub cloud_init_template: Option<String>,
    pub sync_threshold_mb: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        ProvisionConfig {
            cloud_init_template: None,
            sync_threshold_mb: 100,
        }
    }
}

impl AzlinConfig {
    pub fn load(path: &Path) -> Result<AzlinConfig> {
        if !path.exists() {
            return Ok(AzlinConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        crate::atomic::write_atomic(path, text.as_bytes())
    }
}

/// Resolved environment variables.
#[derive(Debug, Clone)]
pub struct AzlinEnv {
    pub vm_boot_wait_secs: u64,
    pub noninteractive: bool,
    pub default_resource_group: Option<String>,
    pub default_region: Option<String>,
    pub default_vm_size: Option<String>,
    pub debug: bool,
}

impl AzlinEnv {
    pub fn from_process_env() -> AzlinEnv {
        AzlinEnv {
            vm_boot_wait_secs: std::env::var("AZLIN_VM_BOOT_WAIT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|v| v.min(3600))
                .unwrap_or(75),
            noninteractive: std::env::var("AZLIN_NONINTERACTIVE").as_deref() == Ok("1"),
            default_resource_group: std::env::var("AZLIN_DEFAULT_RESOURCE_GROUP").ok(),
            default_region: std::env::var("AZLIN_DEFAULT_REGION").ok(),
            default_vm_size: std::env::var("AZLIN_DEFAULT_VM_SIZE").ok(),
            debug: std::env::var("AZLIN_DEBUG").as_deref() == Ok("1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let cfg = AzlinConfig::load(&path).unwrap();
        assert!(cfg.default_region.is_none());
        assert_eq!(cfg.provision.sync_threshold_mb, 100);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut cfg = AzlinConfig::default();
        cfg.default_region = Some("eastus".to_string());
        cfg.save(&path).unwrap();
        let loaded = AzlinConfig::load(&path).unwrap();
        assert_eq!(loaded.default_region.as_deref(), Some("eastus"));
    }
}
