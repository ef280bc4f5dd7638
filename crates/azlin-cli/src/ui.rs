//! Colored status lines and spinners for long-running operations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

fn prefix() -> String {
    "[azlin]".bold().cyan().to_string()
}

pub fn info(msg: &str) {
    println!("{} {}", prefix(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", prefix(), msg.green());
}

pub fn warn(msg: &str) {
    println!("{} {}", prefix(), msg.yellow());
}

/// Starts a running spinner with `msg`. Callers finish it with
/// `.finish_and_clear()` once the operation completes.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {msg}")
            .expect("invalid spinner template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
