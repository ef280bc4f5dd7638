//! # azlin-governor
//!
//! Orphan & Quota Governor: read-only scans by default, destructive
//! actions gated behind `dry_run=false` and the shared `DeletionGate`
//! safety invariants. Depends on the Cloud Driver only — no callback
//! path back into `azlin-cache`.

pub mod orphan;
pub mod quota;
pub mod safety;

pub use orphan::{CleanupResult, OrphanDetector, OrphanType, ScanOptions};
pub use quota::QuotaManager;
pub use safety::DeletionGate;
