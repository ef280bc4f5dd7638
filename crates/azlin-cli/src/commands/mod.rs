mod connect;
mod fleet;
mod inspect;
mod lifecycle;
mod orphans;
mod quota;
mod storage;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::context::AppContext;
use crate::output::OutputFormat;

/// Matches the top-level `Commands` enum and calls the matching
/// `cmd_*` handler. Every handler returns `anyhow::Result`; an
/// `AzlinError` downcast out of that chain drives the process exit
/// code in `main`.
pub fn dispatch(cli: Cli, ctx: &mut AppContext) -> Result<()> {
    let output = cli.output_format();
    let resource_group_arg = cli.resource_group.clone();
    match cli.command {
        Commands::New {
            name,
            region,
            size,
            repo,
            attach_nfs,
            use_bastion,
            cloud_init_template,
        } => lifecycle::cmd_new(
            ctx,
            output,
            resource_group_arg,
            name,
            region,
            size,
            repo,
            attach_nfs,
            use_bastion,
            cloud_init_template,
        ),
        Commands::Destroy { vm, force } => lifecycle::cmd_destroy(ctx, resource_group_arg, &vm, force),
        Commands::Clone { source, target, region, size } => {
            lifecycle::cmd_clone(ctx, output, resource_group_arg, &source, &target, region, size)
        }
        Commands::Stop(targets) => fleet::cmd_stop(ctx, output, resource_group_arg, &targets),
        Commands::Start(targets) => fleet::cmd_start(ctx, output, resource_group_arg, &targets),
        Commands::Connect { target, use_bastion, no_bastion, tmux_session } => {
            connect::cmd_connect(ctx, resource_group_arg, &target, use_bastion, no_bastion, tmux_session)
        }
        Commands::Exec { targets, command, timeout_secs, concurrency } => {
            fleet::cmd_exec(ctx, output, resource_group_arg, &targets, command, timeout_secs, concurrency)
        }
        Commands::Cp { sources, destination } => connect::cmd_cp(ctx, resource_group_arg, sources, destination),
        Commands::List => inspect::cmd_list(ctx, output, resource_group_arg),
        Commands::Status { vm } => inspect::cmd_status(ctx, output, resource_group_arg, &vm),
        Commands::Top => inspect::cmd_top(ctx, resource_group_arg),
        Commands::Storage(cmd) => storage::dispatch(ctx, output, resource_group_arg, cmd),
        Commands::Orphans(cmd) => orphans::dispatch(ctx, output, resource_group_arg, cmd),
        Commands::Quota(cmd) => quota::dispatch(ctx, output, cmd),
        Commands::Completions { shell } => {
            emit_completions(shell);
            Ok(())
        }
    }
}

fn emit_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

pub(crate) fn print_summary(label: &str, format: OutputFormat, succeeded: usize, failed: usize) {
    if format == OutputFormat::Table {
        println!("{label}: {succeeded} succeeded, {failed} failed");
    }
}
