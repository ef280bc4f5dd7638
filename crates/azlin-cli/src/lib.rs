//! # azlin-cli
//!
//! The `clap` surface, output rendering (table/JSON/YAML), and command
//! dispatch wiring the other eight crates into the `azlin` binary.

pub mod cli;
pub mod commands;
pub mod context;
pub mod output;
pub mod ui;

use clap::Parser;

pub use cli::Cli;
pub use context::AppContext;

/// Parses `argv`, builds the shared driver/cache/config context, and
/// dispatches to the matching command handler. Returns the process
/// exit code: `AzlinError`'s own mapping when the failure classifies,
/// 1 otherwise.
pub fn run() -> i32 {
    let cli = Cli::parse();
    azlin_core::logging::init(azlin_core::logging::LogFormat::Human, std::env::var("AZLIN_DEBUG").as_deref() == Ok("1"));

    let mut ctx = match AppContext::load() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    match commands::dispatch(cli, &mut ctx) {
        Ok(()) => 0,
        Err(e) => {
            if let Some(azlin_err) = e.downcast_ref::<azlin_core::AzlinError>() {
                eprintln!("error: {azlin_err}");
                if let Some(hint) = azlin_err.remediation() {
                    eprintln!("hint: {hint}");
                }
                azlin_err.exit_code()
            } else {
                eprintln!("error: {e}");
                1
            }
        }
    }
}
