use std::time::Duration;

use crate::cache::KeyPatterns;
use crate::storage::Entity;

use super::{RepoError, Result};

/// When list caches sharing the invalidation prefix are cleared after a
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationMode {
    /// Spawn the prefix deletion on the tokio runtime and return immediately.
    #[default]
    Background,
    /// Await the prefix deletion before the operation returns.
    Inline,
}

/// Construction parameters of a cached repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Template of single-entity keys, e.g. `user:email:{email}`.
    pub entity_pattern: String,
    /// Template of list keys; must contain `{limit}` and `{page}`.
    pub list_pattern: String,
    /// Expiry of every cache entry written by the repository.
    pub cache_ttl_seconds: u64,
    /// Keys starting with this prefix are bulk-deleted after each mutation.
    /// `None` (or an empty string) disables bulk invalidation.
    pub invalidation_prefix: Option<String>,
    pub invalidation: InvalidationMode,
}

impl RepositoryConfig {
    pub const DEFAULT_TTL_SECONDS: u64 = 3600;

    /// Creates a configuration with the default TTL and no invalidation prefix.
    pub fn new(entity_pattern: impl Into<String>, list_pattern: impl Into<String>) -> Self {
        Self {
            entity_pattern: entity_pattern.into(),
            list_pattern: list_pattern.into(),
            cache_ttl_seconds: Self::DEFAULT_TTL_SECONDS,
            invalidation_prefix: None,
            invalidation: InvalidationMode::default(),
        }
    }

    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    /// Sets the invalidation prefix. An empty string disables invalidation.
    pub fn with_invalidation_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.invalidation_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_invalidation_mode(mut self, mode: InvalidationMode) -> Self {
        self.invalidation = mode;
        self
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Returns the effective invalidation prefix, treating `Some("")` as none.
    pub fn invalidation_prefix(&self) -> Option<&str> {
        self.invalidation_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
    }

    /// Validates the configuration for entity type `E` and parses its key
    /// patterns.
    pub fn compile<E: Entity>(&self) -> Result<KeyPatterns> {
        if self.cache_ttl_seconds == 0 {
            return Err(RepoError::Configuration(format!(
                "cache TTL for {} must be a positive number of seconds",
                E::NAME
            )));
        }

        let patterns = KeyPatterns::new(
            &self.entity_pattern,
            &self.list_pattern,
            E::NAME,
            E::KEY_FIELDS,
        )?;

        // Invalidation runs after the write-through and must not delete it.
        if let Some(prefix) = self.invalidation_prefix() {
            if patterns.entity().may_start_with(prefix) {
                return Err(RepoError::Configuration(format!(
                    "invalidation prefix '{prefix}' overlaps {} entity keys '{}'",
                    E::NAME,
                    patterns.entity()
                )));
            }
        }
        Ok(patterns)
    }
}
