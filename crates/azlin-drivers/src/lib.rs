//! # azlin-drivers
//!
//! Concrete implementations of the three external interfaces the core
//! depends on: the Cloud Driver, the SSH Driver, and the Secret Vault
//! Driver. Every implementation shells out to an
//! existing tool (`az`, `ssh`, `ssh-keygen`) rather than reimplementing
//! a cloud SDK or an SSH client.

pub mod auth;
pub mod cloud;
pub mod shell;
pub mod ssh;
pub mod strategy;
pub mod vault;

pub use cloud::{AzureCliDriver, CloudDriver};
pub use ssh::{OpenSshDriver, SshDriver};
pub use strategy::CloudStrategy;
pub use vault::{AzureKeyVaultDriver, SecretVaultDriver};
