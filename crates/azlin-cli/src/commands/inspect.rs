use anyhow::Result;
use tabled::Tabled;

use azlin_cache::{ImmutableData, MutableData};
use azlin_core::{AzlinError, VmRecord};
use azlin_drivers::cloud::CloudDriver;

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
    hourly_cost: String,
}

impl From<&VmRecord> for VmRow {
    fn from(vm: &VmRecord) -> Self {
        VmRow {
            name: vm.name.clone(),
            resource_group: vm.resource_group.clone(),
            region: vm.region.clone(),
            size: vm.size.clone(),
            power_state: vm.power_state.to_string(),
            public_ip: vm.public_ip.clone().unwrap_or_else(|| "-".to_string()),
            hourly_cost: format!("${:.3}/hr", azlin_core::cost::hourly_rate(&vm.size)),
        }
    }
}

/// Fetches the live fleet and opportunistically refreshes the cache —
/// `list` is read-mostly, so a cache-write failure is logged and
/// swallowed rather than failing the command.
pub fn cmd_list(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref()).ok();
    let vms = ctx.cloud.list_vms(rg.as_deref())?;
    for vm in &vms {
        if !vm.is_cacheable() {
            continue;
        }
        if let Err(e) = ctx.cache.set_full(
            &vm.resource_group,
            &vm.name,
            ImmutableData {
                region: vm.region.clone(),
                size: vm.size.clone(),
                image: vm.image.clone(),
                created_at: vm.created_at,
                tags: vm.tags.clone(),
            },
            MutableData {
                power_state: vm.power_state,
                public_ip: vm.public_ip.clone(),
                private_ip: vm.private_ip.clone(),
                provisioning_state: vm.provisioning_state.clone(),
            },
        ) {
            tracing::warn!(error = %e, "failed to refresh vm list cache entry");
        }
    }
    let rows: Vec<VmRow> = vms.iter().map(VmRow::from).collect();
    output::render_list(&rows, format);
    Ok(())
}

pub fn cmd_status(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>, vm: &str) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let record = ctx
        .show_vm(vm, &rg)?
        .ok_or_else(|| AzlinError::ResourceNotFound(format!("{vm} in {rg}")))?;
    output::render_one(&VmRow::from(&record), format);
    Ok(())
}

/// One-pass snapshot (no curses refresh loop) of every VM's power
/// state and accruing hourly cost for the resolved resource group.
pub fn cmd_top(ctx: &AppContext, resource_group: Option<String>) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let vms = ctx.cloud.list_vms(Some(&rg))?;
    let running: Vec<_> = vms.iter().filter(|v| v.power_state == azlin_core::PowerState::Running).collect();
    let total_hourly: f64 = running.iter().map(|v| azlin_core::cost::hourly_rate(&v.size)).sum();
    println!("{} VMs running, {} stopped/deallocated", running.len(), vms.len() - running.len());
    println!("accruing cost: ${total_hourly:.3}/hr (${:.2}/day)", total_hourly * 24.0);
    for vm in &running {
        println!(
            "  {:<24} {:<16} {}",
            vm.name,
            vm.size,
            vm.public_ip.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
