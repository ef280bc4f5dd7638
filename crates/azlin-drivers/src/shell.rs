//! Thin wrapper around `std::process::Command` for shelling out to the
//! `az` CLI, `ssh`, `scp`, and `rsync`. There is no custom I/O reactor
//! here by design (see the crate-level docs): every call blocks the
//! calling worker thread.

use std::process::{Command, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};

/// Runs `program` with `args`, capturing stdout/stderr, bounded by
/// `timeout` (best-effort: no timeout enforcement without a watchdog
/// thread, so callers needing a hard deadline should wrap this in one;
/// az/ssh invocations use `azlin_core::retry` plus their own
/// driver-level timeout instead).
pub fn run(program: &str, args: &[&str]) -> Result<Output> {
    #[cfg(test)]
    if let Some(out) = shell_mock::intercept(program, args) {
        return Ok(out);
    }
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning {program}"))
}

pub fn run_visible(program: &str, args: &[&str]) -> Result<std::process::ExitStatus> {
    #[cfg(test)]
    if let Some(out) = shell_mock::intercept(program, args) {
        return Ok(out.status);
    }
    Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("spawning {program}"))
        .map_err(Into::into)
}

/// Spawns a long-lived child (e.g. `az network bastion tunnel`) without
/// waiting for it; the caller supervises readiness and lifetime.
pub fn spawn_child(program: &str, args: &[&str]) -> Result<std::process::Child> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning {program}"))
}

/// Replaces the current process image for interactive handoff (direct
/// `ssh` sessions). Args are passed as an array, never shell
/// interpolated, so this is safe against injection even though it
/// never returns on success.
#[cfg(unix)]
pub fn replace_process(program: &str, args: &[&str]) -> Result<()> {
    use std::os::unix::process::CommandExt;
    let err = Command::new(program).args(args).exec();
    Err(anyhow::anyhow!("exec {program} failed: {err}"))
}

pub const DEFAULT_CLOUD_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_SSH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TUNNEL_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CLI_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Test-only interception point so driver unit tests never invoke a
/// real `az`/`ssh` binary. Tests register expected invocations; calls
/// that don't match fall through to `None` and the real command runs
/// (which would then fail in CI without the binaries present — so
/// driver tests always register every call they make).
#[cfg(test)]
pub mod shell_mock {
    use std::cell::RefCell;
    use std::process::{ExitStatus, Output};

    thread_local! {
        static SCRIPT: RefCell<Vec<(String, Vec<String>, Output)>> = RefCell::new(Vec::new());
    }

    pub fn expect(program: &str, args: &[&str], stdout: &str, stderr: &str, success: bool) {
        let status = fake_status(success);
        let out = Output {
            status,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        };
        SCRIPT.with(|s| {
            s.borrow_mut().push((
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
                out,
            ))
        });
    }

    pub fn intercept(program: &str, args: &[&str]) -> Option<Output> {
        SCRIPT.with(|s| {
            let mut script = s.borrow_mut();
            let pos = script
                .iter()
                .position(|(p, a, _)| p == program && a.iter().map(String::as_str).eq(args.iter().copied()))?;
            let (_, _, out) = script.remove(pos);
            Some(out)
        })
    }

    #[cfg(unix)]
    fn fake_status(success: bool) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(if success { 0 } else { 1 << 8 })
    }

    #[cfg(not(unix))]
    fn fake_status(_success: bool) -> ExitStatus {
        std::process::Command::new("cmd")
            .arg("/C")
            .arg("exit 0")
            .status()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mocked_run_returns_registered_output() {
        shell_mock::expect("az", &["account", "show"], "{\"id\":\"sub\"}", "", true);
        let out = run("az", &["account", "show"]).unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "{\"id\":\"sub\"}");
    }

    #[test]
    fn mocked_run_reports_failure() {
        shell_mock::expect("az", &["vm", "show"], "", "ERROR: not found", false);
        let out = run("az", &["vm", "show"]).unwrap();
        assert!(!out.status.success());
        assert!(String::from_utf8_lossy(&out.stderr).contains("not found"));
    }
}
