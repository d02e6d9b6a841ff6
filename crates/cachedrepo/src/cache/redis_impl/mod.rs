//! Redis cache backend implementation.
//!
//! Provides a shared cache for multi-instance deployments, with TTL and
//! prefix deletion through `SCAN`.

mod cache;
mod error;

pub use cache::RedisCache;
