//! Cache backend implementations.
//!
//! Concrete implementations of the [`Cache`](cachedrepo_core::cache::Cache)
//! trait. The in-memory LRU cache is always compiled; Redis is behind the
//! `redis` feature.

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
