use anyhow::Result;
use tabled::Tabled;

use azlin_fleet::{CancelToken, FleetEngine, FleetOp};

use crate::cli::FleetTargetArgs;
use crate::context::AppContext;
use crate::output::{self, OutputFormat};

#[derive(serde::Serialize, Tabled)]
struct ResultRow {
    name: String,
    ok: bool,
    detail: String,
}

fn render_summary(summary: azlin_fleet::Summary, format: OutputFormat) {
    let rows: Vec<ResultRow> = summary
        .results
        .iter()
        .map(|r| ResultRow {
            name: r.name.clone(),
            ok: r.ok,
            detail: r.message.clone().unwrap_or_else(|| "ok".to_string()),
        })
        .collect();
    output::render_list(&rows, format);
    super::print_summary("fleet operation", format, summary.succeeded, summary.failed);
}

fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    let _ = ctrlc::set_handler(move || handle.cancel());
    cancel
}

pub fn cmd_stop(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>, targets: &FleetTargetArgs) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let selector = targets.to_selector()?;
    let engine = FleetEngine::new(&ctx.cloud, &ctx.ssh);
    let spinner = crate::ui::spinner("stopping VMs...");
    let summary = engine.run(
        &FleetOp::Stop { deallocate: true },
        &rg,
        &selector,
        targets.concurrency,
        &cancel_on_ctrl_c(),
    )?;
    spinner.finish_and_clear();
    render_summary(summary, format);
    Ok(())
}

pub fn cmd_start(ctx: &AppContext, format: OutputFormat, resource_group: Option<String>, targets: &FleetTargetArgs) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let selector = targets.to_selector()?;
    let engine = FleetEngine::new(&ctx.cloud, &ctx.ssh);
    let spinner = crate::ui::spinner("starting VMs...");
    let summary = engine.run(&FleetOp::Start, &rg, &selector, targets.concurrency, &cancel_on_ctrl_c())?;
    spinner.finish_and_clear();
    render_summary(summary, format);
    Ok(())
}

pub fn cmd_exec(
    ctx: &AppContext,
    format: OutputFormat,
    resource_group: Option<String>,
    targets: &FleetTargetArgs,
    command: Vec<String>,
    timeout_secs: u64,
    concurrency: usize,
) -> Result<()> {
    let rg = ctx.resolve_resource_group(resource_group.as_deref())?;
    let selector = targets.to_selector()?;
    let op = FleetOp::Exec {
        command: command.join(" "),
        timeout: crate::cli::exec_timeout(timeout_secs),
    };
    let engine = FleetEngine::new(&ctx.cloud, &ctx.ssh);
    let spinner = crate::ui::spinner("running command across fleet...");
    let summary = engine.run(&op, &rg, &selector, concurrency, &cancel_on_ctrl_c())?;
    spinner.finish_and_clear();
    render_summary(summary, format);
    Ok(())
}
