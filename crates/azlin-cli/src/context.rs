use anyhow::{Context, Result};

use azlin_cache::{ConnectionTracker, VmMetadataCache};
use azlin_connect::BastionConfigStore;
use azlin_core::config::{AzlinConfig, AzlinEnv};
use azlin_decision::InteractionHandler;
use azlin_drivers::cloud::{AzureCliDriver, CloudDriver};
use azlin_drivers::ssh::OpenSshDriver;
use azlin_drivers::vault::SecretVaultDriver;

/// Everything a command handler needs, built once in `main` and
/// borrowed by every `cmd_*` function. Owns the driver instances so
/// handlers can hand out `&dyn Trait` references without lifetime
/// gymnastics at each call site.
pub struct AppContext {
    pub cloud: AzureCliDriver,
    pub ssh: OpenSshDriver,
    pub vault: Box<dyn SecretVaultDriver>,
    pub cache: VmMetadataCache,
    pub bastion_config: BastionConfigStore,
    pub tracker: ConnectionTracker,
    pub interaction: Box<dyn InteractionHandler>,
    pub config: AzlinConfig,
    pub env: AzlinEnv,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config_path = azlin_core::paths::config_path().context("resolving config path")?;
        let config = AzlinConfig::load(&config_path).context("loading config.toml")?;
        Ok(AppContext {
            cloud: AzureCliDriver::new(),
            ssh: OpenSshDriver::new(),
            vault: azlin_drivers::vault::default_provider(),
            cache: VmMetadataCache::open_default().context("opening vm_list_cache.json")?,
            bastion_config: BastionConfigStore::open_default().context("opening bastion_config.toml")?,
            tracker: ConnectionTracker::open_default().context("opening connections.json")?,
            interaction: azlin_decision::from_env(),
            config,
            env: AzlinEnv::from_process_env(),
        })
    }

    pub fn resolve_resource_group(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.env.default_resource_group.clone())
            .or_else(|| self.config.default_resource_group.clone())
            .context("no resource group given and no default configured (set AZLIN_DEFAULT_RESOURCE_GROUP or default_resource_group in config.toml)")
    }

    pub fn resolve_region(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.env.default_region.clone())
            .or_else(|| self.config.default_region.clone())
    }

    pub fn resolve_size(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.env.default_vm_size.clone())
            .or_else(|| self.config.default_vm_size.clone())
    }

    pub fn show_vm(&self, name: &str, rg: &str) -> Result<Option<azlin_core::VmRecord>, azlin_core::AzlinError> {
        self.cloud.show_vm(rg, name)
    }
}
