use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use azlin_core::{cost, AzlinError, ConnectionDescriptor, VmRecord};
use azlin_drivers::cloud::CloudDriver;
use azlin_drivers::ssh::SshDriver;
use azlin_connect::direct_descriptor;
use tracing::{info, warn};

use crate::op::FleetOp;
use crate::selector::Selector;

/// The default used upstream (CLI/library callers) when the user
/// doesn't pass `--concurrency`; `run` itself never assumes a default.
pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone)]
pub struct PerVmResult {
    pub name: String,
    pub ok: bool,
    pub message: Option<String>,
    pub hourly_cost_delta: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<PerVmResult>,
}

/// Cooperative cancellation handle: in-flight tasks run to completion,
/// queued chunks are skipped once this flips.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bounded-concurrency fan-out over a VM selector, modeled on the
/// chunked thread-spawn shape used for instance batch start/stop: split
/// targets into `concurrency`-sized chunks, spawn one thread per target
/// in a chunk, join the chunk before starting the next.
pub struct FleetEngine<'a> {
    cloud: &'a dyn CloudDriver,
    ssh: &'a dyn SshDriver,
}

impl<'a> FleetEngine<'a> {
    pub fn new(cloud: &'a dyn CloudDriver, ssh: &'a dyn SshDriver) -> Self {
        FleetEngine { cloud, ssh }
    }

    pub fn run(
        &self,
        op: &FleetOp,
        resource_group: &str,
        selector: &Selector,
        concurrency: usize,
        cancel: &CancelToken,
    ) -> Result<Summary, AzlinError> {
        let targets = selector.resolve(self.cloud, resource_group)?;
        // `concurrency` is the caller's configured value (defaulting to
        // `DEFAULT_CONCURRENCY` upstream); here it's only ever capped
        // down to the number of targets, never up.
        let concurrency = concurrency.max(1).min(targets.len().max(1));

        info!(resource_group, count = targets.len(), concurrency, op = ?op, "running fleet operation");

        let mut results: Vec<PerVmResult> = Vec::with_capacity(targets.len());
        for chunk in targets.chunks(concurrency) {
            if cancel.is_cancelled() {
                break;
            }
            // One thread per target in the chunk, joined before the next
            // chunk starts. `std::thread::scope` lets each thread borrow
            // `self.cloud`/`self.ssh` directly instead of cloning trait
            // objects across an owned-thread boundary.
            let outcomes: Vec<(String, Result<Option<f64>, AzlinError>)> = std::thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|vm| {
                        let vm = vm.clone();
                        scope.spawn(move || {
                            let outcome = execute_one(self.cloud, self.ssh, op, &vm);
                            (vm.name, outcome)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            ("unknown".to_string(), Err(AzlinError::InternalError("fleet task panicked".to_string())))
                        })
                    })
                    .collect()
            });

            for (name, outcome) in outcomes {
                match outcome {
                    Ok(hourly_cost_delta) => results.push(PerVmResult {
                        name,
                        ok: true,
                        message: None,
                        hourly_cost_delta,
                    }),
                    Err(e) => {
                        warn!(vm = %name, error = %e, "fleet operation failed for one target");
                        results.push(PerVmResult {
                            name,
                            ok: false,
                            message: Some(e.to_string()),
                            hourly_cost_delta: None,
                        });
                    }
                }
            }
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        let succeeded = results.iter().filter(|r| r.ok).count();
        let failed = results.len() - succeeded;
        Ok(Summary {
            total: targets.len(),
            succeeded,
            failed,
            results,
        })
    }
}

fn execute_one(
    cloud: &dyn CloudDriver,
    ssh: &dyn SshDriver,
    op: &FleetOp,
    vm: &VmRecord,
) -> Result<Option<f64>, AzlinError> {
    let cost_delta = if op.carries_cost_delta() {
        Some(cost::hourly_rate(&vm.size))
    } else {
        None
    };

    match op {
        FleetOp::Stop { deallocate } => {
            if *deallocate {
                cloud.deallocate_vm(&vm.resource_group, &vm.name)?;
            } else {
                cloud.stop_vm(&vm.resource_group, &vm.name)?;
            }
            Ok(cost_delta.map(|r| -r))
        }
        FleetOp::Start => {
            cloud.start_vm(&vm.resource_group, &vm.name)?;
            Ok(cost_delta)
        }
        FleetOp::Tag { tags } => {
            cloud.set_tags(&vm.resource_group, &vm.name, tags)?;
            Ok(None)
        }
        FleetOp::Exec { command, timeout } => {
            let descriptor = descriptor_for(vm)?;
            let output = ssh.execute_remote(&descriptor, command, *timeout)?;
            if !output.status.success() {
                return Err(AzlinError::ConnectionError(format!(
                    "{}: {}",
                    vm.name,
                    String::from_utf8_lossy(&output.stderr)
                )));
            }
            Ok(None)
        }
        FleetOp::Sync { local_path, remote_path, upload } => {
            sync_one(vm, local_path, remote_path, *upload)?;
            Ok(None)
        }
    }
}

fn descriptor_for(vm: &VmRecord) -> Result<ConnectionDescriptor, AzlinError> {
    let (private_key_path, _) = azlin_core::paths::ssh_key_paths().map_err(|e| AzlinError::InternalError(e.to_string()))?;
    direct_descriptor(vm, private_key_path)
}

fn sync_one(vm: &VmRecord, local_path: &str, remote_path: &str, upload: bool) -> Result<(), AzlinError> {
    let descriptor = descriptor_for(vm)?;
    let remote_spec = format!("{}@{}:{}", descriptor.user, descriptor.host, remote_path);
    let ssh_cmd = format!(
        "ssh -i {} -p {} -o StrictHostKeyChecking=accept-new -o BatchMode=yes",
        descriptor.private_key_path.display(),
        descriptor.port
    );
    let (src, dst) = if upload { (local_path, remote_spec.as_str()) } else { (remote_spec.as_str(), local_path) };
    let output = azlin_drivers::shell::run("rsync", &["-az", "-e", ssh_cmd.as_str(), src, dst])
        .map_err(|e| AzlinError::ConnectionError(e.to_string()))?;
    if !output.status.success() {
        return Err(AzlinError::ConnectionError(format!(
            "rsync to {}: {}",
            vm.name,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use azlin_drivers::cloud::fake::FakeCloudDriver;
    use azlin_drivers::ssh::OpenSshDriver;
    use chrono::Utc;
    use std::collections::BTreeMap as Map;

    fn vm(name: &str, size: &str) -> VmRecord {
        VmRecord {
            name: name.to_string(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: size.into(),
            image: "Ubuntu2404".into(),
            created_at: Utc::now(),
            tags: Map::new(),
            power_state: azlin_core::PowerState::Running,
            public_ip: Some("1.2.3.4".into()),
            private_ip: Some("10.0.0.4".into()),
            provisioning_state: "Succeeded".into(),
        }
    }

    #[test]
    fn stop_all_reports_negative_cost_delta_and_stable_sorted_names() {
        let driver = FakeCloudDriver::new();
        driver.seed(vm("web-2", "Standard_D2s_v3"));
        driver.seed(vm("web-1", "Standard_B1s"));
        let ssh = OpenSshDriver::new();
        let engine = FleetEngine::new(&driver, &ssh);
        let summary = engine
            .run(&FleetOp::Stop { deallocate: false }, "rg", &Selector::All, 5, &CancelToken::new())
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        let names: Vec<_> = summary.results.iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);
        assert!(summary.results.iter().all(|r| r.hourly_cost_delta.unwrap() < 0.0));
    }

    #[test]
    fn tag_does_not_carry_a_cost_delta() {
        let driver = FakeCloudDriver::new();
        driver.seed(vm("a", "Standard_B1s"));
        let ssh = OpenSshDriver::new();
        let engine = FleetEngine::new(&driver, &ssh);
        let mut tags = Map::new();
        tags.insert("env".to_string(), "dev".to_string());
        let summary = engine
            .run(&FleetOp::Tag { tags }, "rg", &Selector::All, 5, &CancelToken::new())
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(summary.results[0].hourly_cost_delta.is_none());
    }

    #[test]
    fn concurrency_is_capped_at_target_count() {
        let driver = FakeCloudDriver::new();
        driver.seed(vm("solo", "Standard_B1s"));
        let ssh = OpenSshDriver::new();
        let engine = FleetEngine::new(&driver, &ssh);
        let summary = engine
            .run(&FleetOp::Start, "rg", &Selector::All, 50, &CancelToken::new())
            .unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let driver = FakeCloudDriver::new();
        driver.seed(vm("a", "Standard_B1s"));
        driver.seed(vm("b", "Standard_B1s"));
        let ssh = OpenSshDriver::new();
        let engine = FleetEngine::new(&driver, &ssh);
        let cancel = CancelToken::new();
        cancel.cancel();
        let summary = engine.run(&FleetOp::Start, "rg", &Selector::All, 1, &cancel).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.results.len(), 0);
    }

    #[test]
    fn empty_selector_is_a_no_op_summary() {
        let driver = FakeCloudDriver::new();
        let ssh = OpenSshDriver::new();
        let engine = FleetEngine::new(&driver, &ssh);
        let summary = engine.run(&FleetOp::Start, "rg", &Selector::All, 5, &CancelToken::new()).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
    }
}
