use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "azlin", version, about = "Fleet management for Ubuntu development VMs on Azure")]
pub struct Cli {
    /// Output format: table, json, or yaml.
    #[arg(short = 'o', long = "output", global = true, default_value = "table")]
    pub output: String,

    /// Resource group override; falls back to AZLIN_DEFAULT_RESOURCE_GROUP then config.toml.
    #[arg(long = "resource-group", short = 'g', global = true)]
    pub resource_group: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_str_arg(&self.output)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision a new VM.
    New {
        #[arg(long)]
        name: String,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long = "attach-nfs")]
        attach_nfs: Option<String>,
        #[arg(long = "use-bastion")]
        use_bastion: bool,
        #[arg(long = "cloud-init-template")]
        cloud_init_template: Option<String>,
    },

    /// Delete a VM and its tracked resources.
    Destroy {
        vm: String,
        #[arg(long)]
        force: bool,
    },

    /// Clone an existing VM's configuration into a new one.
    Clone {
        source: String,
        target: String,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },

    /// Stop one, many, or all VMs.
    Stop(FleetTargetArgs),

    /// Start one, many, or all VMs.
    Start(FleetTargetArgs),

    /// Connect to a VM over SSH, routed via Bastion when needed.
    Connect {
        /// VM name or bare IP address.
        target: String,
        #[arg(long = "use-bastion")]
        use_bastion: bool,
        #[arg(long = "no-bastion")]
        no_bastion: bool,
        #[arg(long = "tmux-session")]
        tmux_session: Option<String>,
    },

    /// Run a command on one or more VMs without an interactive session.
    Exec {
        #[command(flatten)]
        targets: FleetTargetArgs,
        /// Command to run, everything after `--`.
        #[arg(last = true, required = true)]
        command: Vec<String>,
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
        #[arg(long, default_value_t = azlin_fleet::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Copy files to or from a VM. Every source must be on the same side.
    Cp {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<String>,
        destination: String,
    },

    /// List known VMs.
    List,

    /// Show full detail for one VM.
    Status { vm: String },

    /// Live per-VM running/stopped snapshot, one pass (no curses UI).
    Top,

    /// Manage shared storage accounts.
    #[command(subcommand)]
    Storage(StorageCmd),

    /// Scan for and clean up orphaned cloud resources.
    #[command(subcommand)]
    Orphans(OrphansCmd),

    /// Manage storage quotas.
    #[command(subcommand)]
    Quota(QuotaCmd),

    /// Emit a shell completion script.
    Completions { shell: clap_complete::Shell },
}

#[derive(clap::Args, Debug, Clone)]
pub struct FleetTargetArgs {
    /// Target every VM in the resource group.
    #[arg(long, conflicts_with_all = ["pattern", "vm"])]
    pub all: bool,
    /// Shell-glob pattern over VM names.
    #[arg(long, conflicts_with = "vm")]
    pub pattern: Option<String>,
    /// One VM name (default target form when neither --all nor --pattern given).
    pub vm: Option<String>,
    #[arg(long, default_value_t = azlin_fleet::DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

impl FleetTargetArgs {
    pub fn to_selector(&self) -> anyhow::Result<azlin_fleet::Selector> {
        if self.all {
            Ok(azlin_fleet::Selector::All)
        } else if let Some(p) = &self.pattern {
            Ok(azlin_fleet::Selector::Glob(p.clone()))
        } else if let Some(name) = &self.vm {
            Ok(azlin_fleet::Selector::List(vec![name.clone()]))
        } else {
            anyhow::bail!("specify a VM name, --pattern, or --all")
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum StorageCmd {
    Create {
        name: String,
        #[arg(long)]
        region: Option<String>,
    },
    List,
    Delete {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrphansCmd {
    Scan {
        #[arg(long = "type", value_enum)]
        kind: Option<OrphanKindArg>,
        #[arg(long = "min-age")]
        min_age: Option<i64>,
    },
    Cleanup {
        #[arg(long = "dry-run")]
        dry_run: bool,
        #[arg(long = "min-age")]
        min_age: Option<i64>,
        #[arg(long = "type", value_enum)]
        kind: Option<OrphanKindArg>,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanKindArg {
    Disk,
    Snapshot,
    Storage,
}

#[derive(Subcommand, Debug)]
pub enum QuotaCmd {
    Set {
        #[arg(value_enum)]
        scope: QuotaScopeArg,
        name: String,
        quota_gb: i64,
    },
    Get {
        #[arg(value_enum)]
        scope: QuotaScopeArg,
        name: String,
    },
    List,
    Check {
        #[arg(value_enum)]
        scope: QuotaScopeArg,
        name: String,
        requested_gb: i64,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScopeArg {
    Vm,
    Team,
    Project,
}

impl From<QuotaScopeArg> for azlin_core::QuotaScope {
    fn from(v: QuotaScopeArg) -> Self {
        match v {
            QuotaScopeArg::Vm => azlin_core::QuotaScope::Vm,
            QuotaScopeArg::Team => azlin_core::QuotaScope::Team,
            QuotaScopeArg::Project => azlin_core::QuotaScope::Project,
        }
    }
}

pub fn exec_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
