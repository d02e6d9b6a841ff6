//! In-memory cache backend.
//!
//! Thread-safe LRU cache with lazy TTL expiry for single-instance
//! deployments and tests.

mod cache;

pub use cache::MemoryCache;
