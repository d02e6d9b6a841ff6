//! Demo entity: application users keyed by email.
//!
//! Mirrors a typical `users` table (autoincrement id, unique email, name,
//! optional bio, active flag, timestamps) and is used by the bundled SQLite
//! store, the CLI, and the repository tests.

mod entity;
mod error;
mod operations;
mod types;

pub use error::UserError;
pub use operations::{
    apply_user_update, is_valid_email, validate_user_create, validate_user_update,
};
pub use types::{User, UserCreate, UserResponse, UserUpdate};
