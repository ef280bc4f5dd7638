//! # azlin-decision
//!
//! The Resource Decision Orchestrator: the CREATE/USE_EXISTING/SKIP/
//! CANCEL flow for shared infra (Bastion, cross-region NFS access), a
//! tracker of what it created, and LIFO rollback over that tracker.

pub mod interaction;
pub mod orchestrator;

pub use interaction::{from_env, InteractionHandler, InteractiveHandler, NonInteractiveHandler};
pub use orchestrator::{BastionOpts, Decision, NfsOpts, ResourceDecisionOrchestrator, ResourceStatus, TrackedResource};
