use std::time::Duration;

use azlin_cache::ConnectionTracker;
use azlin_core::{AzlinError, ConnectionDescriptor, VmRecord};
use azlin_decision::InteractionHandler;
use azlin_drivers::cloud::CloudDriver;
use azlin_drivers::ssh::{self, SshDriver};

use crate::bastion_config::BastionConfigStore;
use crate::tunnel::TunnelProcess;

const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);
const DEFAULT_POST_BOOT_WAIT: Duration = Duration::from_secs(75);
const MAX_POST_BOOT_WAIT: Duration = Duration::from_secs(3600);
const TMUX_REPAIR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPath {
    Direct,
    Bastion,
}

#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub use_bastion: bool,
    pub no_bastion: bool,
    pub enable_reconnect: bool,
    pub freshly_provisioned: bool,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        ConnectRequest {
            use_bastion: false,
            no_bastion: false,
            enable_reconnect: true,
            freshly_provisioned: false,
        }
    }
}

/// Chooses a transport path, establishes it, and runs the session.
/// Owns every `TunnelProcess` it spawns — on drop (success, error, or
/// signal) all are terminated.
pub struct ConnectionRouter<'a> {
    driver: &'a dyn CloudDriver,
    ssh: &'a dyn SshDriver,
    bastion_config: &'a BastionConfigStore,
    interaction: &'a dyn InteractionHandler,
    tracker: &'a ConnectionTracker,
    active_tunnel: Option<TunnelProcess>,
}

impl<'a> ConnectionRouter<'a> {
    pub fn new(
        driver: &'a dyn CloudDriver,
        ssh: &'a dyn SshDriver,
        bastion_config: &'a BastionConfigStore,
        interaction: &'a dyn InteractionHandler,
        tracker: &'a ConnectionTracker,
    ) -> Self {
        ConnectionRouter {
            driver,
            ssh,
            bastion_config,
            interaction,
            tracker,
            active_tunnel: None,
        }
    }

    /// Implements the six-step priority order. Returns `Bastion` with
    /// `Err` only for the "private VM, no Bastion" mandatory case.
    pub fn select_path(&self, vm: &VmRecord, request: &ConnectRequest) -> Result<TransportPath, AzlinError> {
        let has_public_ip = vm.public_ip.is_some();

        if request.no_bastion && has_public_ip {
            return Ok(TransportPath::Direct);
        }

        if request.use_bastion {
            let mapped = self.bastion_config.lookup(&vm.name)?;
            let auto = self.driver.list_bastions(&vm.resource_group)?;
            if mapped.is_some() || !auto.is_empty() {
                return Ok(TransportPath::Bastion);
            }
            return Err(AzlinError::ResourceNotFound(
                "use_bastion requested but no Bastion mapping or auto-detected Bastion found".to_string(),
            ));
        }

        if !has_public_ip {
            let mapped = self.bastion_config.lookup(&vm.name)?;
            let auto = self.driver.list_bastions(&vm.resource_group)?;
            if mapped.is_some() || !auto.is_empty() {
                return Ok(TransportPath::Bastion);
            }
            return Err(AzlinError::ResourceNotFound(
                "private VM has no public IP and no Bastion is available".to_string(),
            ));
        }

        if self.bastion_config.lookup(&vm.name)?.is_some() {
            return Ok(TransportPath::Bastion);
        }

        let auto = self.driver.list_bastions(&vm.resource_group)?;
        if let Some(bastion) = auto.into_iter().find(|b| b.region == vm.region) {
            let use_it = self.interaction.confirm(
                &format!("Found Bastion '{}' in {}. Use it for this connection?", bastion.name, bastion.region),
                true,
            );
            if use_it {
                return Ok(TransportPath::Bastion);
            }
        }

        Ok(TransportPath::Direct)
    }

    pub fn build_descriptor(&self, vm: &VmRecord, private_key_path: std::path::PathBuf) -> Result<ConnectionDescriptor, AzlinError> {
        direct_descriptor(vm, private_key_path)
    }

    /// Sleeps the configured post-boot window for freshly provisioned
    /// VMs before the tunnel is established, since the network path
    /// becomes routable before SSHD is accepting connections.
    pub fn post_boot_wait(&self, request: &ConnectRequest) {
        if !request.freshly_provisioned {
            return;
        }
        let wait = post_boot_wait_duration();
        tracing::info!(seconds = wait.as_secs(), "waiting for SSHD to become ready");
        std::thread::sleep(wait);
    }

    pub fn repair_tmux_socket(&self, descriptor: &ConnectionDescriptor, image: &str, uid: u32) {
        if !ssh::is_known_affected_image(image) {
            return;
        }
        let script = ssh::tmux_repair_script(uid);
        if let Err(e) = self.ssh.execute_remote(descriptor, &script, TMUX_REPAIR_TIMEOUT) {
            tracing::debug!(error = %e, "tmux socket repair failed, continuing");
        }
    }

    /// Runs `remote_cmd` (or an interactive session if `None`),
    /// attaching to `tmux_session` when given, retrying per the
    /// reconnect policy on network-loss exit codes. Clean exits (0)
    /// never retry.
    pub fn connect_with_reconnect(
        &mut self,
        vm: &VmRecord,
        descriptor: &ConnectionDescriptor,
        remote_cmd: Option<&str>,
        tmux_session: Option<&str>,
        request: &ConnectRequest,
    ) -> Result<i32, AzlinError> {
        let max_attempts = if request.enable_reconnect { DEFAULT_RECONNECT_ATTEMPTS } else { 1 };
        let mut last_err = None;
        for attempt in 0..max_attempts {
            if attempt > 0 {
                std::thread::sleep(RECONNECT_BACKOFF);
            }
            match self.ssh.connect(descriptor, remote_cmd, tmux_session) {
                Ok(code) => {
                    self.tracker.record_connected(&vm.resource_group, &vm.name);
                    if code == 0 || !is_network_loss_exit_code(code) {
                        return Ok(code);
                    }
                    last_err = Some(AzlinError::NetworkUnreachable(format!(
                        "ssh exited with code {code}, retrying"
                    )));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| AzlinError::ConnectionError("reconnect attempts exhausted".to_string())))
    }

    pub fn has_active_tunnel(&self) -> bool {
        self.active_tunnel.is_some()
    }

    pub fn set_active_tunnel(&mut self, tunnel: TunnelProcess) {
        self.active_tunnel = Some(tunnel);
    }

    pub fn close_tunnel(&mut self) {
        self.active_tunnel = None;
    }
}

fn post_boot_wait_duration() -> Duration {
    let configured = std::env::var("AZLIN_VM_BOOT_WAIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POST_BOOT_WAIT);
    configured.min(MAX_POST_BOOT_WAIT)
}

/// SSH's own convention: exit code 255 covers connection-level
/// failures (timeouts, resets, host unreachable) as opposed to the
/// remote command's own exit status.
fn is_network_loss_exit_code(code: i32) -> bool {
    code == 255
}

/// Builds a direct (no Bastion tunnel) descriptor for a VM, preferring
/// its public IP. Shared with the fleet engine's `exec`/`sync` path,
/// which never prompts for a transport choice and always goes direct.
pub fn direct_descriptor(vm: &VmRecord, private_key_path: std::path::PathBuf) -> Result<ConnectionDescriptor, AzlinError> {
    let host = vm
        .public_ip
        .clone()
        .or_else(|| vm.private_ip.clone())
        .ok_or_else(|| AzlinError::ConnectionError(format!("{} has no IP address recorded", vm.name)))?;
    Ok(ConnectionDescriptor {
        host,
        port: 22,
        user: "azlin".to_string(),
        private_key_path,
        jump_via_bastion_tunnel: None,
    })
}
