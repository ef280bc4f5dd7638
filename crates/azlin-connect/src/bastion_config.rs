use std::path::PathBuf;

use azlin_core::{AzlinError, BastionMapping};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    mappings: Vec<BastionMapping>,
}

/// `bastion_config.toml`: admin-curated `(vm, bastion, enabled)`
/// mappings. A mapping with `enabled=false` stays visible to admin
/// listing but is invisible to route lookup.
pub struct BastionConfigStore {
    path: PathBuf,
}

impl BastionConfigStore {
    pub fn new(path: PathBuf) -> Self {
        BastionConfigStore { path }
    }

    pub fn open_default() -> Result<Self, AzlinError> {
        let path = azlin_core::paths::bastion_config_path().map_err(|e| AzlinError::InternalError(e.to_string()))?;
        Ok(BastionConfigStore::new(path))
    }

    fn load(&self) -> Result<StoredConfig, AzlinError> {
        let Ok(text) = std::fs::read_to_string(&self.path) else {
            return Ok(StoredConfig::default());
        };
        toml::from_str(&text).map_err(|e| AzlinError::CorruptedState(format!("bastion_config.toml: {e}")))
    }

    fn store(&self, config: &StoredConfig) -> Result<(), AzlinError> {
        if let Some(parent) = self.path.parent() {
            azlin_core::paths::ensure_private_dir(parent).map_err(|e| AzlinError::InternalError(e.to_string()))?;
        }
        let text = toml::to_string_pretty(config).map_err(|e| AzlinError::InternalError(e.to_string()))?;
        azlin_core::atomic::write_atomic(&self.path, text.as_bytes()).map_err(|e| AzlinError::InternalError(e.to_string()))
    }

    /// Only `enabled` mappings are returned — the invariant the Router
    /// relies on when consulting this store during path selection.
    pub fn lookup(&self, vm_name: &str) -> Result<Option<BastionMapping>, AzlinError> {
        let config = self.load()?;
        Ok(config
            .mappings
            .into_iter()
            .find(|m| m.vm_name == vm_name && m.enabled))
    }

    pub fn list_all(&self) -> Result<Vec<BastionMapping>, AzlinError> {
        Ok(self.load()?.mappings)
    }

    pub fn upsert(&self, mapping: BastionMapping) -> Result<(), AzlinError> {
        let mut config = self.load()?;
        if let Some(existing) = config.mappings.iter_mut().find(|m| m.vm_name == mapping.vm_name) {
            *existing = mapping;
        } else {
            config.mappings.push(mapping);
        }
        self.store(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(vm: &str, enabled: bool) -> BastionMapping {
        BastionMapping {
            vm_name: vm.to_string(),
            vm_resource_group: "rg".to_string(),
            bastion_name: "b1".to_string(),
            bastion_resource_group: "rg".to_string(),
            enabled,
        }
    }

    #[test]
    fn disabled_mapping_is_invisible_to_lookup_but_visible_to_list() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BastionConfigStore::new(tmp.path().join("bastion_config.toml"));
        store.upsert(mapping("vm1", false)).unwrap();
        assert!(store.lookup("vm1").unwrap().is_none());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn enabled_mapping_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BastionConfigStore::new(tmp.path().join("bastion_config.toml"));
        store.upsert(mapping("vm1", true)).unwrap();
        let found = store.lookup("vm1").unwrap().unwrap();
        assert_eq!(found.bastion_name, "b1");
    }

    #[test]
    fn upsert_replaces_existing_mapping_for_same_vm() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BastionConfigStore::new(tmp.path().join("bastion_config.toml"));
        store.upsert(mapping("vm1", true)).unwrap();
        let mut updated = mapping("vm1", true);
        updated.bastion_name = "b2".to_string();
        store.upsert(updated).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(store.lookup("vm1").unwrap().unwrap().bastion_name, "b2");
    }
}
