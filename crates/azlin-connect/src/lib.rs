//! # azlin-connect
//!
//! The Bastion/Connection Router: path selection, tunnel lifecycle,
//! reconnect policy, and the persistent Bastion mapping config.

pub mod bastion_config;
pub mod port;
pub mod router;
pub mod tunnel;

pub use bastion_config::BastionConfigStore;
pub use port::allocate_port;
pub use router::{direct_descriptor, ConnectRequest, ConnectionRouter, TransportPath};
pub use tunnel::TunnelProcess;
