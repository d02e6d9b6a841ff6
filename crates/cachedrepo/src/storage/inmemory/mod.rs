//! In-memory storage backend for testing.
//!
//! Rows live in a `BTreeMap` keyed by an autoincrement id, so iteration is
//! already in primary key order.
//!
//! # Example
//!
//! ```rust
//! use cachedrepo::storage::InMemoryStore;
//! use cachedrepo_core::user::User;
//!
//! let store = InMemoryStore::<User>::new();
//! ```

mod entity;
mod repository;

pub use entity::MemoryEntity;
pub use repository::InMemoryStore;
