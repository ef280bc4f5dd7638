use anyhow::{Context, Result};
use tabled::Tabled;

use azlin_core::naming;
use azlin_lifecycle::{LifecycleOrchestrator, ProvisionRequest};

use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(serde::Serialize, Tabled)]
struct VmRow {
    name: String,
    resource_group: String,
    region: String,
    size: String,
    power_state: String,
    public_ip: String,
}

impl From<&azlin_core::VmRecord> for VmRow {
    fn from(vm: &azlin_core::VmRecord) -> Self {
        VmRow {
            name: vm.name.clone(),
            resource_group: vm.resource_group.clone(),
            region: vm.region.clone(),
            size: vm.size.clone(),
            power_state: vm.power_state.to_string(),
            public_ip: vm.public_ip.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_new(
    ctx: &AppContext,
    format: OutputFormat,
    resource_group: Option<String>,
    name: String,
    region: Option<String>,
    size: Option<String>,
    repo: Option<String>,
    attach_nfs: Option<String>,
    use_bastion: bool,
    cloud_init_template: Option<String>,
) -> Result<()> {
    naming::validate_vm_name(&name).map_err(azlin_core::AzlinError::ValidationError)?;
    let region = ctx
        .resolve_region(region.as_deref())
        .context("no region given and no default configured")?;
    let size = ctx.resolve_size(size.as_deref()).unwrap_or_else(|| "Standard_B2s".to_string());
    let req = ProvisionRequest {
        name,
        region,
        size,
        resource_group,
        repo_url: repo,
        attach_nfs,
        use_bastion,
        cloud_init_template_override: cloud_init_template,
    };
    let orch = LifecycleOrchestrator::new(
        &ctx.cloud,
        &ctx.ssh,
        ctx.vault.as_ref(),
        &ctx.cache,
        ctx.interaction.as_ref(),
    );
    let spinner = crate::ui::spinner("provisioning VM...");
    let vm = orch.provision(&req);
    spinner.finish_and_clear();
    let vm = vm?;
    output::render_one(&VmRow::from(&vm), format);
    Ok(())
}

pub fn cmd_destroy(ctx: &AppContext, resource_group: Option<String>, vm: &str, force: bool) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let orch = LifecycleOrchestrator::new(
        &ctx.cloud,
        &ctx.ssh,
        ctx.vault.as_ref(),
        &ctx.cache,
        ctx.interaction.as_ref(),
    );
    orch.destroy(vm, &rg, force)?;
    crate::ui::success(&format!("destroyed {vm}"));
    Ok(())
}

pub fn cmd_clone(
    ctx: &AppContext,
    format: OutputFormat,
    resource_group: Option<String>,
    source: &str,
    target: &str,
    region: Option<String>,
    size: Option<String>,
) -> Result<()> {
    naming::validate_vm_name(target).map_err(azlin_core::AzlinError::ValidationError)?;
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let source_vm = ctx
        .show_vm(source, &rg)?
        .ok_or_else(|| azlin_core::AzlinError::ResourceNotFound(format!("{source} in {rg}")))?;
    let source_req = ProvisionRequest {
        name: source_vm.name.clone(),
        region: source_vm.region.clone(),
        size: source_vm.size.clone(),
        resource_group: Some(rg.clone()),
        repo_url: None,
        attach_nfs: None,
        use_bastion: false,
        cloud_init_template_override: None,
    };
    let target_req = ProvisionRequest {
        name: target.to_string(),
        region: region.unwrap_or_else(|| source_vm.region.clone()),
        size: size.unwrap_or_else(|| source_vm.size.clone()),
        resource_group: Some(rg.clone()),
        repo_url: None,
        attach_nfs: None,
        use_bastion: false,
        cloud_init_template_override: None,
    };
    let orch = LifecycleOrchestrator::new(
        &ctx.cloud,
        &ctx.ssh,
        ctx.vault.as_ref(),
        &ctx.cache,
        ctx.interaction.as_ref(),
    );
    let spinner = crate::ui::spinner("cloning VM...");
    let vm = orch.clone_vm(&source_req, &target_req, &rg);
    spinner.finish_and_clear();
    let vm = vm?;
    output::render_one(&VmRow::from(&vm), format);
    Ok(())
}
