use anyhow::{bail, Context, Result};

use azlin_connect::{allocate_port, ConnectRequest, ConnectionRouter, TransportPath, TunnelProcess};
use azlin_core::{AzlinError, VmRecord};

use crate::context::AppContext;

/// Resolves `target` to a `VmRecord` either by cache/cloud lookup, or
/// synthesizes a bare-IP one for a direct connection that was never
/// provisioned through azlin (spec allows `connect <vm|ip>`).
fn resolve_target(ctx: &AppContext, rg: &str, target: &str) -> Result<VmRecord> {
    if target.parse::<std::net::IpAddr>().is_ok() {
        return Ok(VmRecord {
            name: target.to_string(),
            resource_group: rg.to_string(),
            region: String::new(),
            size: String::new(),
            image: String::new(),
            created_at: chrono::Utc::now(),
            tags: Default::default(),
            power_state: azlin_core::PowerState::Unknown,
            public_ip: Some(target.to_string()),
            private_ip: None,
            provisioning_state: String::new(),
        });
    }
    ctx.show_vm(target, rg)?
        .ok_or_else(|| AzlinError::ResourceNotFound(format!("{target} in {rg}")))
        .map_err(Into::into)
}

pub fn cmd_connect(
    ctx: &AppContext,
    resource_group: Option<String>,
    target: &str,
    use_bastion: bool,
    no_bastion: bool,
    tmux_session: Option<String>,
) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let vm = resolve_target(ctx, &rg, target)?;
    let request = ConnectRequest {
        use_bastion,
        no_bastion,
        enable_reconnect: true,
        freshly_provisioned: false,
    };

    let mut router = ConnectionRouter::new(
        &ctx.cloud,
        &ctx.ssh,
        &ctx.bastion_config,
        ctx.interaction.as_ref(),
        &ctx.tracker,
    );
    let path = router.select_path(&vm, &request)?;
    router.post_boot_wait(&request);

    let (private_key_path, _) = azlin_core::paths::ssh_key_paths().context("resolving SSH key paths")?;
    let mut descriptor = router.build_descriptor(&vm, private_key_path)?;

    if path == TransportPath::Bastion {
        use azlin_drivers::cloud::CloudDriver;
        let bastions = ctx.cloud.list_bastions(&rg)?;
        let bastion = bastions
            .into_iter()
            .next()
            .ok_or_else(|| AzlinError::ResourceNotFound("no Bastion available in resource group".to_string()))?;
        let local_port = allocate_port()?;
        let target_resource_id = format!("{}/{}", rg, vm.name);
        let tunnel = TunnelProcess::spawn(&ctx.cloud, &bastion, &target_resource_id, local_port, 22)?;
        descriptor.host = "127.0.0.1".to_string();
        descriptor.port = local_port.port;
        router.set_active_tunnel(tunnel);
    }

    let code = router.connect_with_reconnect(&vm, &descriptor, None, tmux_session.as_deref(), &request)?;
    router.close_tunnel();
    std::process::exit(code);
}

/// Enforces the "all sources on the same side" rule: every source is
/// either a bare local path, or every source is `vm:path` for the same
/// VM. Mixed sides are rejected before any transfer starts.
fn classify_sources(sources: &[String]) -> Result<(bool, String, Vec<String>)> {
    let mut upload = None;
    let mut vm_name = None;
    let mut paths = Vec::with_capacity(sources.len());
    for src in sources {
        match src.split_once(':') {
            Some((vm, path)) => {
                if upload == Some(true) {
                    bail!("cannot mix local and remote sources in one cp invocation");
                }
                if let Some(existing) = &vm_name {
                    if existing != vm {
                        bail!("all remote sources must reference the same VM ('{existing}' vs '{vm}')");
                    }
                } else {
                    vm_name = Some(vm.to_string());
                }
                upload = Some(false);
                paths.push(path.to_string());
            }
            None => {
                if upload == Some(false) {
                    bail!("cannot mix local and remote sources in one cp invocation");
                }
                upload = Some(true);
                paths.push(src.clone());
            }
        }
    }
    let upload = upload.unwrap_or(true);
    Ok((upload, vm_name.unwrap_or_default(), paths))
}

pub fn cmd_cp(ctx: &AppContext, resource_group: Option<String>, sources: Vec<String>, destination: String) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let (upload, src_vm, src_paths) = classify_sources(&sources)?;

    let (vm_name, remote_path, local_paths) = if upload {
        let (dest_vm, dest_path) = destination
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("uploading requires a 'vm:path' destination"))?;
        (dest_vm.to_string(), dest_path.to_string(), src_paths)
    } else {
        (src_vm, src_paths.into_iter().next().unwrap_or_default(), vec![destination])
    };

    let vm = ctx
        .show_vm(&vm_name, &rg)?
        .ok_or_else(|| AzlinError::ResourceNotFound(format!("{vm_name} in {rg}")))?;
    let (private_key_path, _) = azlin_core::paths::ssh_key_paths().context("resolving SSH key paths")?;
    let descriptor = azlin_connect::direct_descriptor(&vm, private_key_path)?;
    let local_path = local_paths.first().cloned().unwrap_or_default();
    let remote_spec = format!("{}@{}:{}", descriptor.user, descriptor.host, remote_path);
    let ssh_cmd = format!(
        "ssh -i {} -p {} -o StrictHostKeyChecking=accept-new -o BatchMode=yes",
        descriptor.private_key_path.display(),
        descriptor.port
    );
    let (src, dst) = if upload {
        (local_path.as_str(), remote_spec.as_str())
    } else {
        (remote_spec.as_str(), local_path.as_str())
    };
    let output = azlin_drivers::shell::run("rsync", &["-az", "-e", ssh_cmd.as_str(), src, dst])
        .map_err(|e| AzlinError::ConnectionError(e.to_string()))?;
    if !output.status.success() {
        bail!(AzlinError::ConnectionError(String::from_utf8_lossy(&output.stderr).to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_sources_rejects_mixed_sides() {
        let err = classify_sources(&["local.txt".to_string(), "vm1:/remote.txt".to_string()]).unwrap_err();
        assert!(err.to_string().contains("mix"));
    }

    #[test]
    fn classify_sources_accepts_all_remote_same_vm() {
        let (upload, vm, paths) = classify_sources(&["vm1:/a".to_string(), "vm1:/b".to_string()]).unwrap();
        assert!(!upload);
        assert_eq!(vm, "vm1");
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn classify_sources_rejects_different_vms() {
        let err = classify_sources(&["vm1:/a".to_string(), "vm2:/b".to_string()]).unwrap_err();
        assert!(err.to_string().contains("same VM"));
    }
}
