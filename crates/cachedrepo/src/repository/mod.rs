//! Cache-aside repository engine.
//!
//! [`CachedRepository`] sits in front of a durable [`Store`] and a [`Cache`]:
//!
//! - **Reads**: check the cache first, on miss fetch from the store and
//!   populate the cache (read-repair)
//! - **Writes**: persist to the store, write the new view through to the
//!   cache, then invalidate list pages under the configured prefix
//!
//! Cache faults never fail an operation; they are logged and degrade to a
//! miss or a skipped write.
//!
//! [`Store`]: cachedrepo_core::storage::Store
//! [`Cache`]: cachedrepo_core::cache::Cache

mod engine;

pub use engine::CachedRepository;
