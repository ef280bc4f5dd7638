//! # azlin — fleet management for Ubuntu development VMs on Azure
//!
//! Facade crate that re-exports the azlin workspace crates so consumers
//! can depend on a single `azlin` library.
//!
//! ## Crate breakdown
//!
//! | Module | Crate | Purpose |
//! |--------|-------|---------|
//! | [`core`] | azlin-core | Data model, error taxonomy, naming/tag validation, paths |
//! | [`drivers`] | azlin-drivers | Cloud Driver, SSH Driver, Secret Vault Driver |
//! | [`cache`] | azlin-cache | Tiered VM metadata cache, connection tracker |
//! | [`governor`] | azlin-governor | Orphan detection and storage quotas |
//! | [`decision`] | azlin-decision | Shared-infra create/use-existing/skip/cancel flow |
//! | [`connect`] | azlin-connect | Bastion/connection routing and tunnels |
//! | [`lifecycle`] | azlin-lifecycle | Provision/destroy/stop/start/clone orchestration |
//! | [`fleet`] | azlin-fleet | Bounded-concurrency multi-VM operations |
//! | [`cli`] | azlin-cli | `clap` surface and command dispatch |

pub use azlin_cache as cache;
pub use azlin_cli as cli;
pub use azlin_connect as connect;
pub use azlin_core as core;
pub use azlin_decision as decision;
pub use azlin_drivers as drivers;
pub use azlin_fleet as fleet;
pub use azlin_governor as governor;
pub use azlin_lifecycle as lifecycle;
