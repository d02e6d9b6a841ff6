//! SQLite storage backend implementation.
//!
//! Stores the demo `User` entity using `rusqlite` for synchronous operations
//! and `tokio-rusqlite` for async wrapping.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteUserStore;
