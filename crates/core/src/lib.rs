//! Functional core of the cachedrepo project.
//!
//! Everything in this crate is pure: key patterns, cache serialization,
//! pagination arithmetic, the error taxonomy, and the traits that the
//! imperative shell (`cachedrepo`) implements for concrete cache and
//! storage backends.

pub mod cache;
pub mod pagination;
pub mod repository;
pub mod storage;
pub mod user;
