use anyhow::Result;
use tabled::Tabled;

use azlin_drivers::cloud::CloudDriver;

use crate::cli::StorageCmd;
use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(serde::Serialize, Tabled)]
struct StorageRow {
    name: String,
    size_gb: i64,
    connected_vms: String,
}

pub fn dispatch(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>, cmd: StorageCmd) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    match cmd {
        StorageCmd::Create { name, region } => {
            let region = ctx.resolve_region(region.as_deref()).unwrap_or_else(|| "eastus".to_string());
            let acc = ctx.cloud.create_storage(&rg, &name, &region)?;
            output::render_one(
                &StorageRow {
                    name: acc.name,
                    size_gb: acc.size_gb,
                    connected_vms: acc.connected_vms.join(","),
                },
                format,
            );
            Ok(())
        }
        StorageCmd::List => {
            let accounts = ctx.cloud.list_storage(&rg)?;
            let rows: Vec<StorageRow> = accounts
                .into_iter()
                .map(|a| StorageRow {
                    name: a.name,
                    size_gb: a.size_gb,
                    connected_vms: a.connected_vms.join(","),
                })
                .collect();
            output::render_list(&rows, format);
            Ok(())
        }
        StorageCmd::Delete { name } => {
            ctx.cloud.delete_storage(&rg, &name)?;
            println!("deleted {name}");
            Ok(())
        }
    }
}
