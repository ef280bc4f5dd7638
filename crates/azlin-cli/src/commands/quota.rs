use anyhow::Result;
use tabled::Tabled;

use azlin_core::QuotaScope;
use azlin_governor::QuotaManager;

use crate::cli::{QuotaCmd, QuotaScopeArg};
use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(serde::Serialize, Tabled)]
struct QuotaRow {
    scope: String,
    name: String,
    used_gb: i64,
    available_gb: i64,
    utilization_percent: String,
}

pub fn dispatch(ctx: &AppContext, format: OutputFormat, cmd: QuotaCmd) -> Result<()> {
    let manager = QuotaManager::open_default(&ctx.cloud)?;
    match cmd {
        QuotaCmd::Set { scope, name, quota_gb } => {
            manager.set_quota(QuotaScope::from(scope), &name, quota_gb)?;
            println!("quota set: {name} ({quota_gb}GB)");
            Ok(())
        }
        QuotaCmd::Get { scope, name } => {
            let status = manager.get_quota(QuotaScope::from(scope), &name)?;
            output::render_one(
                &QuotaRow {
                    scope: scope_label(scope),
                    name,
                    used_gb: status.used_gb,
                    available_gb: status.available_gb,
                    utilization_percent: format!("{:.1}%", status.utilization_percent),
                },
                format,
            );
            Ok(())
        }
        QuotaCmd::List => {
            let rows: Vec<QuotaRow> = manager
                .list_all()?
                .into_iter()
                .map(|(scope, name, status)| QuotaRow {
                    scope: scope.to_string(),
                    name,
                    used_gb: status.used_gb,
                    available_gb: status.available_gb,
                    utilization_percent: format!("{:.1}%", status.utilization_percent),
                })
                .collect();
            output::render_list(&rows, format);
            Ok(())
        }
        QuotaCmd::Check { scope, name, requested_gb } => {
            let check = manager.check_quota(QuotaScope::from(scope), &name, requested_gb)?;
            if check.available {
                println!("ok: {} GB would remain after this request", check.remaining_after_gb);
            } else {
                println!("quota exceeded: {} GB short", -check.remaining_after_gb);
            }
            Ok(())
        }
    }
}

fn scope_label(scope: QuotaScopeArg) -> String {
    QuotaScope::from(scope).to_string()
}
