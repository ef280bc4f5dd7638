use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use azlin_core::{AzlinError, PortAllocation};

/// Probes `TcpListener::bind` across the ephemeral range, returning the
/// first free port. Binding (not just connect-failure) avoids racing
/// another process that's mid-bind on the same port.
pub fn allocate_port() -> Result<PortAllocation, AzlinError> {
    for port in PortAllocation::RANGE_START..=PortAllocation::RANGE_END {
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(PortAllocation { port });
        }
    }
    Err(AzlinError::PortInUse(format!(
        "no free port in {}..={}",
        PortAllocation::RANGE_START,
        PortAllocation::RANGE_END
    )))
}

/// Polls `host:port` until a TCP connection succeeds or `timeout`
/// elapses. Used for both tunnel readiness and post-boot SSH
/// reachability checks.
pub fn wait_for_tcp_ready(host: &str, port: u16, timeout: Duration) -> Result<(), AzlinError> {
    let deadline = Instant::now() + timeout;
    let addr = format!("{host}:{port}");
    loop {
        let per_attempt = Duration::from_millis(500).min(deadline.saturating_duration_since(Instant::now()));
        if let Ok(addrs) = std::net::ToSocketAddrs::to_socket_addrs(&addr) {
            for socket_addr in addrs {
                if TcpStream::connect_timeout(&socket_addr, per_attempt).is_ok() {
                    return Ok(());
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(AzlinError::Timeout(format!("{addr} not ready within {timeout:?}")));
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}
