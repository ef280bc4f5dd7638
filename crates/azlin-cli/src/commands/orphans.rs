use anyhow::Result;
use tabled::Tabled;

use azlin_core::OrphanReport;
use azlin_governor::{OrphanDetector, OrphanType, ScanOptions};

use crate::cli::{OrphanKindArg, OrphansCmd};
use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(serde::Serialize, Tabled)]
struct OrphanRow {
    kind: String,
    id: String,
    size_gb: i64,
    age_days: i64,
    monthly_cost: String,
    reason: String,
}

impl From<&OrphanReport> for OrphanRow {
    fn from(r: &OrphanReport) -> Self {
        let kind = match r {
            OrphanReport::Disk { .. } => "disk",
            OrphanReport::Snapshot { .. } => "snapshot",
            OrphanReport::Storage { .. } => "storage",
        };
        let (age_days, reason) = match r {
            OrphanReport::Disk { age_days, reason, .. }
            | OrphanReport::Snapshot { age_days, reason, .. }
            | OrphanReport::Storage { age_days, reason, .. } => (*age_days, reason.clone()),
        };
        OrphanRow {
            kind: kind.to_string(),
            id: r.id().to_string(),
            size_gb: r.size_gb(),
            age_days,
            monthly_cost: format!("${:.2}/mo", r.monthly_cost()),
            reason,
        }
    }
}

fn to_type(kind: OrphanKindArg) -> OrphanType {
    match kind {
        OrphanKindArg::Disk => OrphanType::Disk,
        OrphanKindArg::Snapshot => OrphanType::Snapshot,
        OrphanKindArg::Storage => OrphanType::Storage,
    }
}

pub fn dispatch(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>, cmd: OrphansCmd) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let detector = OrphanDetector::new(&ctx.cloud);
    match cmd {
        OrphansCmd::Scan { kind, min_age } => {
            let opts = ScanOptions {
                min_age_days: min_age,
                shared_storage_names: Vec::new(),
            };
            let reports = match kind {
                Some(k) => match to_type(k) {
                    OrphanType::Disk => detector.scan_disks(&rg, &opts)?,
                    OrphanType::Snapshot => detector.scan_snapshots(&rg, &opts)?,
                    OrphanType::Storage => detector.scan_storage(&rg, &opts)?,
                },
                None => detector.scan_all(&rg, &opts)?,
            };
            let rows: Vec<OrphanRow> = reports.iter().map(OrphanRow::from).collect();
            output::render_list(&rows, format);
            Ok(())
        }
        OrphansCmd::Cleanup { dry_run, min_age, kind } => {
            let opts = ScanOptions {
                min_age_days: min_age,
                shared_storage_names: Vec::new(),
            };
            let kinds = match kind {
                Some(k) => vec![to_type(k)],
                None => vec![OrphanType::Disk, OrphanType::Snapshot, OrphanType::Storage],
            };
            let mut freed_gb = 0;
            let mut freed_cost = 0.0;
            let mut deleted = 0;
            let mut errors = Vec::new();
            for kind in kinds {
                let result = detector.cleanup(&rg, kind, &opts, dry_run)?;
                freed_gb += result.freed_gb;
                freed_cost += result.freed_monthly_cost;
                deleted += result.deleted_ids.len();
                errors.extend(result.errors);
            }
            if dry_run {
                println!("dry run: would free {freed_gb}GB (${freed_cost:.2}/mo)");
            } else {
                println!("freed {freed_gb}GB (${freed_cost:.2}/mo), {deleted} resources deleted");
            }
            for (id, err) in &errors {
                println!("  error deleting {id}: {err}");
            }
            Ok(())
        }
    }
}
