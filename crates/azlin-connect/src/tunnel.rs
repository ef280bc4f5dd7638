use std::process::Child;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use azlin_core::{AzlinError, PortAllocation, TunnelState};
use azlin_drivers::cloud::{BastionInfo, CloudDriver};

const TUNNEL_READY_TIMEOUT: Duration = Duration::from_secs(30);
const GRACEFUL_SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Owns a live `az network bastion tunnel` child process. Drop tries a
/// graceful SIGTERM first, escalating to SIGKILL after the grace
/// window, and deregisters from the process-wide shutdown registry.
pub struct TunnelProcess {
    child: Child,
    pub local_port: PortAllocation,
    pub state: TunnelState,
    registry_id: u64,
}

impl TunnelProcess {
    pub fn spawn(
        driver: &dyn CloudDriver,
        bastion: &BastionInfo,
        target_resource_id: &str,
        local_port: PortAllocation,
        remote_port: u16,
    ) -> Result<Self, AzlinError> {
        let child = driver.create_bastion_tunnel(bastion, target_resource_id, local_port.port, remote_port)?;
        let registry_id = shutdown_registry().lock().unwrap().register(child.id());
        let mut tunnel = TunnelProcess {
            child,
            local_port,
            state: TunnelState::Spawning,
            registry_id,
        };
        match crate::port::wait_for_tcp_ready("127.0.0.1", local_port.port, TUNNEL_READY_TIMEOUT) {
            Ok(()) => {
                tunnel.state = TunnelState::Ready;
                Ok(tunnel)
            }
            Err(e) => {
                tunnel.state = TunnelState::Failed;
                tunnel.shutdown();
                Err(e)
            }
        }
    }

    fn shutdown(&mut self) {
        if self.state == TunnelState::Closed {
            return;
        }
        terminate_then_kill(&mut self.child, GRACEFUL_SHUTDOWN_WAIT);
        shutdown_registry().lock().unwrap().deregister(self.registry_id);
        self.state = TunnelState::Closed;
    }
}

impl Drop for TunnelProcess {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(unix)]
fn terminate_then_kill(child: &mut Child, grace: Duration) {
    use std::time::Instant;
    // SAFETY: pid is the live child we own; kill(2) on our own child
    // with SIGTERM is the standard polite-shutdown signal.
    unsafe {
        libc::kill(child.id() as i32, libc::SIGTERM);
    }
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(100)),
            _ => break,
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate_then_kill(child: &mut Child, _grace: Duration) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Tracks every live tunnel child by pid so a catastrophic exit path
/// (panic unwinding past the normal call stack) still has a last-resort
/// list of processes to reap. Normal shutdown goes through `Drop`.
#[derive(Default)]
pub struct ShutdownRegistry {
    next_id: u64,
    live: Vec<(u64, u32)>,
}

impl ShutdownRegistry {
    fn register(&mut self, pid: u32) -> u64 {
        self.next_id += 1;
        self.live.push((self.next_id, pid));
        self.next_id
    }

    fn deregister(&mut self, id: u64) {
        self.live.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn live_pids(&self) -> Vec<u32> {
        self.live.iter().map(|(_, pid)| *pid).collect()
    }
}

pub fn shutdown_registry() -> &'static Mutex<ShutdownRegistry> {
    static REGISTRY: OnceLock<Mutex<ShutdownRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(ShutdownRegistry::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_and_releases_pids() {
        let registry = Mutex::new(ShutdownRegistry::default());
        let id = registry.lock().unwrap().register(1234);
        assert_eq!(registry.lock().unwrap().live_pids(), vec![1234]);
        registry.lock().unwrap().deregister(id);
        assert!(registry.lock().unwrap().live_pids().is_empty());
    }
}
