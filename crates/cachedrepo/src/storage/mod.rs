//! Durable store implementations.
//!
//! Concrete implementations of [`Store`](cachedrepo_core::storage::Store).
//! The generic in-memory store is always available; SQLite is behind the
//! `sqlite` feature (enabled by default).
//!
//! # Examples
//!
//! Build with SQLite (default):
//! ```bash
//! cargo build -p cachedrepo
//! ```
//!
//! Build the library without a relational backend:
//! ```bash
//! cargo build -p cachedrepo --no-default-features
//! ```

pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use inmemory::{InMemoryStore, MemoryEntity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteUserStore;
