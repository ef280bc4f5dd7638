use std::collections::BTreeMap;

use anyhow::{Context, Result};
use azlin_core::{AzlinError, PowerState, VmRecord};
use chrono::Utc;
use serde::Deserialize;

use crate::shell;

#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub subscription_id: String,
    pub tenant_id: String,
}

#[derive(Debug, Clone)]
pub struct VmSpec {
    pub name: String,
    pub resource_group: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_public_key_path: String,
    pub cloud_init_path: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct BastionInfo {
    pub name: String,
    pub resource_group: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct DiskInfo {
    pub id: String,
    pub name: String,
    pub size_gb: i64,
    pub managed_by: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub premium: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub id: String,
    pub name: String,
    pub size_gb: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct StorageAccountInfo {
    pub id: String,
    pub name: String,
    pub size_gb: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    pub connected_vms: Vec<String>,
}

/// Provider-independent interface the core speaks through. Every
/// method either returns a classified `AzlinError` (via
/// `AzlinError::classify_stderr` at the shell boundary) or a parsed
/// result; stdout is parsed as JSON except where noted.
pub trait CloudDriver: Send + Sync {
    fn auth_status(&self) -> Result<AuthStatus, AzlinError>;
    fn create_vm(&self, spec: &VmSpec) -> Result<VmRecord, AzlinError>;
    fn show_vm(&self, rg: &str, name: &str) -> Result<Option<VmRecord>, AzlinError>;
    fn delete_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn list_vms(&self, rg: Option<&str>) -> Result<Vec<VmRecord>, AzlinError>;
    fn start_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn stop_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn deallocate_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn set_tags(&self, rg: &str, name: &str, tags: &BTreeMap<String, String>) -> Result<(), AzlinError>;
    fn get_tags(&self, rg: &str, name: &str) -> Result<BTreeMap<String, String>, AzlinError>;
    fn list_bastions(&self, rg: &str) -> Result<Vec<BastionInfo>, AzlinError>;
    fn create_bastion_tunnel(
        &self,
        bastion: &BastionInfo,
        target_resource_id: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<std::process::Child, AzlinError>;
    fn create_storage(&self, rg: &str, name: &str, region: &str) -> Result<StorageAccountInfo, AzlinError>;
    fn list_storage(&self, rg: &str) -> Result<Vec<StorageAccountInfo>, AzlinError>;
    fn delete_storage(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn list_disks(&self, rg: &str) -> Result<Vec<DiskInfo>, AzlinError>;
    fn list_snapshots(&self, rg: &str) -> Result<Vec<SnapshotInfo>, AzlinError>;
    fn delete_disk(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
    fn delete_snapshot(&self, rg: &str, name: &str) -> Result<(), AzlinError>;
}

/// Shells out to the `az` CLI. Every call parses stdout as JSON
/// (`az ... -o json`) and classifies a non-zero exit's stderr through
/// `AzlinError::classify_stderr`.
pub struct AzureCliDriver;

impl AzureCliDriver {
    pub fn new() -> Self {
        AzureCliDriver
    }

    fn run_json<T: for<'de> Deserialize<'de>>(&self, args: &[&str]) -> Result<T, AzlinError> {
        let mut full_args = args.to_vec();
        full_args.push("-o");
        full_args.push("json");
        let out = shell::run("az", &full_args)
            .map_err(|e| AzlinError::InternalError(e.to_string()))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            tracing::debug!(stderr = %stderr, args = ?full_args, "az invocation failed");
            return Err(AzlinError::classify_stderr(&stderr));
        }
        serde_json::from_slice(&out.stdout)
            .map_err(|e| AzlinError::InternalError(format!("parsing az output: {e}")))
    }

    fn run_ok(&self, args: &[&str]) -> Result<(), AzlinError> {
        let out = shell::run("az", args).map_err(|e| AzlinError::InternalError(e.to_string()))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            tracing::debug!(stderr = %stderr, args = ?args, "az invocation failed");
            return Err(AzlinError::classify_stderr(&stderr));
        }
        Ok(())
    }
}

impl Default for AzureCliDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct AzVmJson {
    name: String,
    #[serde(rename = "resourceGroup")]
    resource_group: String,
    location: String,
    #[serde(rename = "hardwareProfile")]
    hardware_profile: AzHardwareProfile,
    #[serde(rename = "storageProfile")]
    storage_profile: AzStorageProfile,
    tags: Option<BTreeMap<String, String>>,
    #[serde(rename = "provisioningState")]
    provisioning_state: String,
}

#[derive(Deserialize)]
struct AzHardwareProfile {
    #[serde(rename = "vmSize")]
    vm_size: String,
}

#[derive(Deserialize)]
struct AzStorageProfile {
    #[serde(rename = "imageReference")]
    image_reference: AzImageReference,
}

#[derive(Deserialize)]
struct AzImageReference {
    #[serde(default)]
    offer: String,
}

impl CloudDriver for AzureCliDriver {
    fn auth_status(&self) -> Result<AuthStatus, AzlinError> {
        #[derive(Deserialize)]
        struct Account {
            id: String,
            #[serde(rename = "tenantId")]
            tenant_id: String,
        }
        let acct: Account = self.run_json(&["account", "show"])?;
        Ok(AuthStatus {
            subscription_id: acct.id,
            tenant_id: acct.tenant_id,
        })
    }

    fn create_vm(&self, spec: &VmSpec) -> Result<VmRecord, AzlinError> {
        let mut args = vec![
            "vm",
            "create",
            "--resource-group",
            &spec.resource_group,
            "--name",
            &spec.name,
            "--location",
            &spec.region,
            "--size",
            &spec.size,
            "--image",
            &spec.image,
            "--ssh-key-values",
            &spec.ssh_public_key_path,
        ];
        if let Some(ci) = &spec.cloud_init_path {
            args.push("--custom-data");
            args.push(ci);
        }
        let json: AzVmJson = self.run_json(&args)?;
        self.show_vm(&spec.resource_group, &spec.name)?
            .ok_or_else(|| AzlinError::InternalError(format!("vm {} not found after create", json.name)))
    }

    fn show_vm(&self, rg: &str, name: &str) -> Result<Option<VmRecord>, AzlinError> {
        let res: Result<AzVmJson, AzlinError> =
            self.run_json(&["vm", "show", "--resource-group", rg, "--name", name, "--show-details"]);
        match res {
            Ok(v) => Ok(Some(vm_json_to_record(v))),
            Err(AzlinError::ResourceNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["vm", "delete", "--resource-group", rg, "--name", name, "--yes"])
    }

    fn list_vms(&self, rg: Option<&str>) -> Result<Vec<VmRecord>, AzlinError> {
        let mut args = vec!["vm", "list", "--show-details"];
        if let Some(rg) = rg {
            args.push("--resource-group");
            args.push(rg);
        }
        let list: Vec<AzVmJson> = self.run_json(&args)?;
        Ok(list.into_iter().map(vm_json_to_record).collect())
    }

    fn start_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["vm", "start", "--resource-group", rg, "--name", name])
    }

    fn stop_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["vm", "stop", "--resource-group", rg, "--name", name])
    }

    fn deallocate_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["vm", "deallocate", "--resource-group", rg, "--name", name])
    }

    fn set_tags(&self, rg: &str, name: &str, tags: &BTreeMap<String, String>) -> Result<(), AzlinError> {
        let pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut args = vec!["vm", "update", "--resource-group", rg, "--name", name, "--set"];
        let tags_arg = format!("tags={{{}}}", pairs.join(","));
        args.push(&tags_arg);
        self.run_ok(&args)
    }

    fn get_tags(&self, rg: &str, name: &str) -> Result<BTreeMap<String, String>, AzlinError> {
        Ok(self
            .show_vm(rg, name)?
            .map(|r| r.tags)
            .unwrap_or_default())
    }

    fn list_bastions(&self, rg: &str) -> Result<Vec<BastionInfo>, AzlinError> {
        #[derive(Deserialize)]
        struct Bastion {
            name: String,
            #[serde(rename = "resourceGroup")]
            resource_group: String,
            location: String,
        }
        let list: Vec<Bastion> = self.run_json(&["network", "bastion", "list", "--resource-group", rg])?;
        Ok(list
            .into_iter()
            .map(|b| BastionInfo {
                name: b.name,
                resource_group: b.resource_group,
                region: b.location,
            })
            .collect())
    }

    fn create_bastion_tunnel(
        &self,
        bastion: &BastionInfo,
        target_resource_id: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<std::process::Child, AzlinError> {
        let local_port_s = local_port.to_string();
        let remote_port_s = remote_port.to_string();
        let args = [
            "network",
            "bastion",
            "tunnel",
            "--name",
            &bastion.name,
            "--resource-group",
            &bastion.resource_group,
            "--target-resource-id",
            target_resource_id,
            "--resource-port",
            &remote_port_s,
            "--port",
            &local_port_s,
        ];
        shell::spawn_child("az", &args).map_err(|e| AzlinError::InternalError(e.to_string()))
    }

    fn create_storage(&self, rg: &str, name: &str, region: &str) -> Result<StorageAccountInfo, AzlinError> {
        #[derive(Deserialize)]
        struct Acc {
            name: String,
        }
        let acc: Acc = self.run_json(&[
            "storage",
            "account",
            "create",
            "--resource-group",
            rg,
            "--name",
            name,
            "--location",
            region,
        ])?;
        Ok(StorageAccountInfo {
            id: format!("{rg}/{}", acc.name),
            name: acc.name,
            size_gb: 0,
            created_at: Utc::now(),
            tags: BTreeMap::new(),
            connected_vms: Vec::new(),
        })
    }

    fn list_storage(&self, rg: &str) -> Result<Vec<StorageAccountInfo>, AzlinError> {
        #[derive(Deserialize)]
        struct Acc {
            name: String,
            id: String,
            #[serde(default)]
            tags: BTreeMap<String, String>,
        }
        let list: Vec<Acc> = self.run_json(&["storage", "account", "list", "--resource-group", rg])?;
        Ok(list
            .into_iter()
            .map(|a| StorageAccountInfo {
                id: a.id,
                name: a.name,
                size_gb: 0,
                created_at: Utc::now(),
                tags: a.tags,
                connected_vms: Vec::new(),
            })
            .collect())
    }

    fn delete_storage(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["storage", "account", "delete", "--resource-group", rg, "--name", name, "--yes"])
    }

    fn list_disks(&self, rg: &str) -> Result<Vec<DiskInfo>, AzlinError> {
        #[derive(Deserialize)]
        struct Disk {
            name: String,
            id: String,
            #[serde(rename = "diskSizeGb")]
            disk_size_gb: i64,
            #[serde(rename = "managedBy")]
            managed_by: Option<String>,
            #[serde(rename = "timeCreated")]
            time_created: chrono::DateTime<Utc>,
            #[serde(default)]
            tags: BTreeMap<String, String>,
            sku: AzDiskSku,
        }
        #[derive(Deserialize)]
        struct AzDiskSku {
            name: String,
        }
        let list: Vec<Disk> = self.run_json(&["disk", "list", "--resource-group", rg])?;
        Ok(list
            .into_iter()
            .map(|d| DiskInfo {
                id: d.id,
                name: d.name,
                size_gb: d.disk_size_gb,
                managed_by: d.managed_by,
                created_at: d.time_created,
                tags: d.tags,
                premium: d.sku.name.starts_with("Premium"),
            })
            .collect())
    }

    fn list_snapshots(&self, rg: &str) -> Result<Vec<SnapshotInfo>, AzlinError> {
        #[derive(Deserialize)]
        struct Snap {
            name: String,
            id: String,
            #[serde(rename = "diskSizeGb")]
            disk_size_gb: i64,
            #[serde(rename = "timeCreated")]
            time_created: chrono::DateTime<Utc>,
            #[serde(default)]
            tags: BTreeMap<String, String>,
        }
        let list: Vec<Snap> = self.run_json(&["snapshot", "list", "--resource-group", rg])?;
        Ok(list
            .into_iter()
            .map(|s| SnapshotInfo {
                id: s.id,
                name: s.name,
                size_gb: s.disk_size_gb,
                created_at: s.time_created,
                tags: s.tags,
            })
            .collect())
    }

    fn delete_disk(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["disk", "delete", "--resource-group", rg, "--name", name, "--yes"])
    }

    fn delete_snapshot(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
        self.run_ok(&["snapshot", "delete", "--resource-group", rg, "--name", name, "--yes"])
    }
}

fn vm_json_to_record(v: AzVmJson) -> VmRecord {
    VmRecord {
        name: v.name,
        resource_group: v.resource_group,
        region: v.location,
        size: v.hardware_profile.vm_size,
        image: v.storage_profile.image_reference.offer,
        created_at: Utc::now(),
        tags: v.tags.unwrap_or_default(),
        power_state: PowerState::Unknown,
        public_ip: None,
        private_ip: None,
        provisioning_state: v.provisioning_state,
    }
}

/// In-memory driver for unit tests elsewhere in the workspace; never
/// shells out. Gated behind `test-util` so it cannot leak into
/// release builds of dependents.
#[cfg(feature = "test-util")]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeCloudDriver {
        pub vms: Mutex<BTreeMap<String, VmRecord>>,
        pub bastions: Mutex<Vec<BastionInfo>>,
        pub fail_next_create: Mutex<bool>,
    }

    impl FakeCloudDriver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, record: VmRecord) {
            self.vms.lock().unwrap().insert(record.cache_key(), record);
        }
    }

    impl CloudDriver for FakeCloudDriver {
        fn auth_status(&self) -> Result<AuthStatus, AzlinError> {
            Ok(AuthStatus {
                subscription_id: "fake-sub".into(),
                tenant_id: "fake-tenant".into(),
            })
        }

        fn create_vm(&self, spec: &VmSpec) -> Result<VmRecord, AzlinError> {
            if *self.fail_next_create.lock().unwrap() {
                *self.fail_next_create.lock().unwrap() = false;
                return Err(AzlinError::ProvisioningError("simulated failure".into()));
            }
            let record = VmRecord {
                name: spec.name.clone(),
                resource_group: spec.resource_group.clone(),
                region: spec.region.clone(),
                size: spec.size.clone(),
                image: spec.image.clone(),
                created_at: Utc::now(),
                tags: spec.tags.clone(),
                power_state: PowerState::Running,
                public_ip: Some("203.0.113.10".into()),
                private_ip: Some("10.0.0.4".into()),
                provisioning_state: "Succeeded".into(),
            };
            self.vms.lock().unwrap().insert(record.cache_key(), record.clone());
            Ok(record)
        }

        fn show_vm(&self, rg: &str, name: &str) -> Result<Option<VmRecord>, AzlinError> {
            Ok(self.vms.lock().unwrap().get(&azlin_core::cache_key(rg, name)).cloned())
        }

        fn delete_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
            self.vms.lock().unwrap().remove(&azlin_core::cache_key(rg, name));
            Ok(())
        }

        fn list_vms(&self, rg: Option<&str>) -> Result<Vec<VmRecord>, AzlinError> {
            Ok(self
                .vms
                .lock()
                .unwrap()
                .values()
                .filter(|v| rg.is_none_or(|rg| v.resource_group == rg))
                .cloned()
                .collect())
        }

        fn start_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
            self.set_power(rg, name, PowerState::Running)
        }

        fn stop_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
            self.set_power(rg, name, PowerState::Stopped)
        }

        fn deallocate_vm(&self, rg: &str, name: &str) -> Result<(), AzlinError> {
            self.set_power(rg, name, PowerState::Deallocated)
        }

        fn set_tags(&self, rg: &str, name: &str, tags: &BTreeMap<String, String>) -> Result<(), AzlinError> {
            let mut vms = self.vms.lock().unwrap();
            let v = vms
                .get_mut(&azlin_core::cache_key(rg, name))
                .ok_or_else(|| AzlinError::ResourceNotFound(name.to_string()))?;
            v.tags.extend(tags.clone());
            Ok(())
        }

        fn get_tags(&self, rg: &str, name: &str) -> Result<BTreeMap<String, String>, AzlinError> {
            Ok(self
                .vms
                .lock()
                .unwrap()
                .get(&azlin_core::cache_key(rg, name))
                .map(|v| v.tags.clone())
                .unwrap_or_default())
        }

        fn list_bastions(&self, rg: &str) -> Result<Vec<BastionInfo>, AzlinError> {
            Ok(self
                .bastions
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.resource_group == rg)
                .cloned()
                .collect())
        }

        fn create_bastion_tunnel(
            &self,
            _bastion: &BastionInfo,
            _target_resource_id: &str,
            _local_port: u16,
            _remote_port: u16,
        ) -> Result<std::process::Child, AzlinError> {
            Err(AzlinError::InternalError("FakeCloudDriver cannot spawn real tunnels".into()))
        }

        fn create_storage(&self, rg: &str, name: &str, _region: &str) -> Result<StorageAccountInfo, AzlinError> {
            Ok(StorageAccountInfo {
                id: format!("{rg}/{name}"),
                name: name.to_string(),
                size_gb: 0,
                created_at: Utc::now(),
                tags: BTreeMap::new(),
                connected_vms: Vec::new(),
            })
        }

        fn list_storage(&self, _rg: &str) -> Result<Vec<StorageAccountInfo>, AzlinError> {
            Ok(Vec::new())
        }

        fn delete_storage(&self, _rg: &str, _name: &str) -> Result<(), AzlinError> {
            Ok(())
        }

        fn list_disks(&self, _rg: &str) -> Result<Vec<DiskInfo>, AzlinError> {
            Ok(Vec::new())
        }

        fn list_snapshots(&self, _rg: &str) -> Result<Vec<SnapshotInfo>, AzlinError> {
            Ok(Vec::new())
        }

        fn delete_disk(&self, _rg: &str, _name: &str) -> Result<(), AzlinError> {
            Ok(())
        }

        fn delete_snapshot(&self, _rg: &str, _name: &str) -> Result<(), AzlinError> {
            Ok(())
        }
    }

    impl FakeCloudDriver {
        fn set_power(&self, rg: &str, name: &str, state: PowerState) -> Result<(), AzlinError> {
            let mut vms = self.vms.lock().unwrap();
            let v = vms
                .get_mut(&azlin_core::cache_key(rg, name))
                .ok_or_else(|| AzlinError::ResourceNotFound(name.to_string()))?;
            v.power_state = state;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_vm_parses_and_creates() {
        crate::shell::shell_mock::expect(
            "az",
            &[
                "vm", "create",
                "--resource-group", "rg1",
                "--name", "vm1",
                "--location", "eastus",
                "--size", "Standard_B1s",
                "--image", "Ubuntu2204",
                "--ssh-key-values", "/k.pub",
                "-o", "json",
            ],
            r#"{"name":"vm1","resourceGroup":"rg1","location":"eastus","hardwareProfile":{"vmSize":"Standard_B1s"},"storageProfile":{"imageReference":{"offer":"Ubuntu2204"}},"tags":{},"provisioningState":"Succeeded"}"#,
            "",
            true,
        );
        crate::shell::shell_mock::expect(
            "az",
            &["vm", "show", "--resource-group", "rg1", "--name", "vm1", "--show-details", "-o", "json"],
            r#"{"name":"vm1","resourceGroup":"rg1","location":"eastus","hardwareProfile":{"vmSize":"Standard_B1s"},"storageProfile":{"imageReference":{"offer":"Ubuntu2204"}},"tags":{},"provisioningState":"Succeeded"}"#,
            "",
            true,
        );
        let driver = AzureCliDriver::new();
        let spec = VmSpec {
            name: "vm1".into(),
            resource_group: "rg1".into(),
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2204".into(),
            ssh_public_key_path: "/k.pub".into(),
            cloud_init_path: None,
            tags: BTreeMap::new(),
        };
        let record = driver.create_vm(&spec).unwrap();
        assert_eq!(record.name, "vm1");
    }

    #[test]
    fn show_vm_not_found_returns_none() {
        crate::shell::shell_mock::expect(
            "az",
            &["vm", "show", "--resource-group", "rg1", "--name", "missing", "--show-details", "-o", "json"],
            "",
            "ERROR: (ResourceNotFound) VM 'missing' not found",
            false,
        );
        let driver = AzureCliDriver::new();
        let found = driver.show_vm("rg1", "missing").unwrap();
        assert!(found.is_none());
    }
}
