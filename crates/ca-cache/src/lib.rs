//! Creative Agent Result Cache
//!
//! Content-addressed cache for generated stories and images:
//! - Keys are the artifact tag plus the SHA-256 of the exact prompt
//! - Entries live for a fixed TTL (24 hours by default)
//! - Store faults degrade to a miss instead of failing the request

#![warn(unreachable_pub)]

pub mod key;
pub mod result_cache;
pub mod store;

pub use key::{cache_key, ArtifactKind};
pub use result_cache::{CacheConfig, ResultCache, DEFAULT_TTL};
pub use store::{CacheError, CacheStore, MemoryCacheStore};

#[cfg(any(test, feature = "testing"))]
pub use store::MockCacheStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
