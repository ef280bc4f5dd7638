//! # azlin-cache
//!
//! The Tiered VM Metadata Cache and its sibling Connection Tracker. A
//! leaf module with no upward dependency on the Governor — cache never
//! calls back into code that decides what to delete.

pub mod cache;
pub mod connections;
pub mod entry;

pub use cache::VmMetadataCache;
pub use connections::ConnectionTracker;
pub use entry::{CacheLookup, ImmutableData, MutableData, VmCacheEntry};
