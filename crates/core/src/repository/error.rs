use thiserror::Error;

use crate::cache::{KeyPatternError, KeyValues};
use crate::pagination::PaginationError;
use crate::storage::StoreError;

/// Errors surfaced by a cached repository.
///
/// Cache faults never appear here: the cache is an optimization and its
/// failures degrade to a miss or a skipped write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("Invalid {entity_type}: {message}")]
    Validation {
        entity_type: &'static str,
        message: String,
    },
    #[error("{entity_type} not found: {key}")]
    NotFound {
        entity_type: &'static str,
        key: String,
    },
    #[error("{entity_type} already exists: {key}")]
    Duplicate {
        entity_type: &'static str,
        key: String,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(StoreError),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<KeyPatternError> for RepoError {
    fn from(err: KeyPatternError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<PaginationError> for RepoError {
    fn from(err: PaginationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Maps a store failure into the repository taxonomy.
///
/// `lookup` is the set of values the caller searched by; when non-empty it
/// replaces the store's own description of the key so the error names what
/// the caller asked for. All other store errors pass through unchanged.
pub fn translate_store_error(err: StoreError, lookup: &KeyValues) -> RepoError {
    let describe = |key: String| {
        if lookup.is_empty() {
            key
        } else {
            lookup.to_string()
        }
    };

    match err {
        StoreError::NotFound { entity_type, key } => RepoError::NotFound {
            entity_type,
            key: describe(key),
        },
        StoreError::AlreadyExists { entity_type, key } => RepoError::Duplicate {
            entity_type,
            key: describe(key),
        },
        other => RepoError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_uses_lookup_values() {
        let err = StoreError::NotFound {
            entity_type: "User",
            key: "unknown".to_string(),
        };
        let lookup = KeyValues::new().with("email", "ada@example.com");

        let translated = translate_store_error(err, &lookup);

        assert_eq!(
            translated,
            RepoError::NotFound {
                entity_type: "User",
                key: "email=ada@example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_already_exists_becomes_duplicate() {
        let err = StoreError::AlreadyExists {
            entity_type: "User",
            key: "email=ada@example.com".to_string(),
        };

        let translated = translate_store_error(err, &KeyValues::new());

        assert_eq!(
            translated.to_string(),
            "User already exists: email=ada@example.com"
        );
        assert!(matches!(translated, RepoError::Duplicate { .. }));
    }

    #[test]
    fn test_other_store_errors_pass_through() {
        let err = StoreError::ConnectionFailed("database is locked".to_string());

        let translated = translate_store_error(err.clone(), &KeyValues::new());

        assert_eq!(translated, RepoError::Store(err));
        assert_eq!(translated.to_string(), "Connection failed: database is locked");
    }

    #[test]
    fn test_key_pattern_error_is_configuration() {
        let err = KeyPatternError::NoPlaceholders {
            pattern: "user".to_string(),
        };

        let repo_err: RepoError = err.into();

        assert!(matches!(repo_err, RepoError::Configuration(_)));
    }

    #[test]
    fn test_pagination_error_is_invalid_argument() {
        let repo_err: RepoError = PaginationError::InvalidPage(0).into();

        assert_eq!(
            repo_err.to_string(),
            "Invalid argument: page must be at least 1, got 0"
        );
    }
}
