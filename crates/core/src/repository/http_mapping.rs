//! Pure functions for mapping repository errors to HTTP status codes.
//!
//! Callers that expose a cached repository over HTTP use this to pick a
//! response status without matching on the taxonomy themselves.

use crate::storage::StoreError;

use super::RepoError;

/// Maps a [`RepoError`] to an HTTP status code.
///
/// - `Validation`, `InvalidArgument` -> 400 (Bad Request)
/// - `NotFound` -> 404 (Not Found)
/// - `Duplicate` -> 409 (Conflict)
/// - `Configuration` -> 500 (Internal Server Error)
/// - `Store(ConnectionFailed)` -> 503 (Service Unavailable)
/// - `Store(InvalidData)` -> 400 (Bad Request)
/// - any other `Store` error -> 500 (Internal Server Error)
///
/// # Examples
///
/// ```
/// use cachedrepo_core::repository::{repo_error_to_status_code, RepoError};
///
/// let error = RepoError::NotFound {
///     entity_type: "User",
///     key: "email=ada@example.com".to_string(),
/// };
/// assert_eq!(repo_error_to_status_code(&error), 404);
/// ```
pub fn repo_error_to_status_code(error: &RepoError) -> u16 {
    match error {
        RepoError::Validation { .. } => 400,
        RepoError::InvalidArgument(_) => 400,
        RepoError::NotFound { .. } => 404,
        RepoError::Duplicate { .. } => 409,
        RepoError::Configuration(_) => 500,
        RepoError::Store(StoreError::ConnectionFailed(_)) => 503,
        RepoError::Store(StoreError::InvalidData(_)) => 400,
        RepoError::Store(_) => 500,
    }
}
