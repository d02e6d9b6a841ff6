//! Imperative shell of the cachedrepo project.
//!
//! Hosts the cache-aside engine ([`repository::CachedRepository`]) and the
//! concrete cache and store backends it runs against. Pure types and traits
//! live in `cachedrepo_core`.

pub mod cache;
pub mod config;
pub mod repository;
pub mod storage;

pub use repository::CachedRepository;
