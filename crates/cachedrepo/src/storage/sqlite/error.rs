//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `StoreError` from
//! `cachedrepo_core::storage`. Specific errors are mapped to semantic variants
//! (e.g., UNIQUE constraint to AlreadyExists).

use cachedrepo_core::storage::StoreError;

/// Maps a rusqlite error to a StoreError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_UNIQUE` → `StoreError::AlreadyExists`
/// - `QueryReturnedNoRows` → `StoreError::NotFound`
/// - Connection errors → `StoreError::ConnectionFailed`
/// - All other errors → `StoreError::QueryFailed`
///
/// `key` describes the row the statement was about and ends up in the
/// `NotFound`/`AlreadyExists` variants.
pub fn map_rusqlite_error(
    err: &rusqlite::Error,
    entity_type: &'static str,
    key: &str,
) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::AlreadyExists {
                entity_type,
                key: key.to_string(),
            }
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            StoreError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::DatabaseBusy
                || sqlite_err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            StoreError::ConnectionFailed(err.to_string())
        }

        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
            entity_type,
            key: key.to_string(),
        },

        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StoreError::Serialization(err.to_string())
        }

        _ => StoreError::QueryFailed(err.to_string()),
    }
}

/// Maps a tokio_rusqlite error to a StoreError.
///
/// This is the main entry point for error mapping in async code.
pub fn map_tokio_rusqlite_error(
    err: tokio_rusqlite::Error,
    entity_type: &'static str,
    key: impl Into<String>,
) -> StoreError {
    let key: String = key.into();
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => {
            map_rusqlite_error(rusqlite_err, entity_type, &key)
        }
        tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => {
            StoreError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        _ => StoreError::QueryFailed(err.to_string()),
    }
}
