use std::num::NonZeroUsize;
use std::{env, time::Duration};

use cachedrepo_core::repository::RepositoryConfig;

const DEFAULT_CACHE_TTL_SECONDS: u64 = RepositoryConfig::DEFAULT_TTL_SECONDS;
const DEFAULT_CACHE_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cache TTL in seconds (default: 3600)
    pub cache_ttl_seconds: u64,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: NonZeroUsize,
    /// Path to SQLite database file (default: "cachedrepo.db")
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
    /// Cache keys with this prefix are cleared after every write (default: none)
    pub invalidation_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 3600)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "cachedrepo.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `INVALIDATION_PREFIX` - Prefix cleared after writes (default: empty)
    ///
    /// Unparseable or zero numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cache_ttl_seconds: lookup("CACHE_TTL_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
            cache_max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .and_then(NonZeroUsize::new)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "cachedrepo.db".to_string()),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            invalidation_prefix: lookup("INVALIDATION_PREFIX").unwrap_or_default(),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Engine configuration for the given key patterns, carrying this
    /// process's TTL and invalidation prefix.
    pub fn repository(&self, entity_pattern: &str, list_pattern: &str) -> RepositoryConfig {
        RepositoryConfig::new(entity_pattern, list_pattern)
            .with_ttl_seconds(self.cache_ttl_seconds)
            .with_invalidation_prefix(self.invalidation_prefix.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config_from(&[]);

        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.cache_max_entries.get(), 10_000);
        assert_eq!(config.sqlite_path, "cachedrepo.db");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.invalidation_prefix, "");
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("CACHE_TTL_SECONDS", "60"),
            ("CACHE_MAX_ENTRIES", "50"),
            ("SQLITE_PATH", "/tmp/users.db"),
            ("REDIS_URL", "redis://cache:6380"),
            ("INVALIDATION_PREFIX", "user:list:"),
        ]);

        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache_max_entries.get(), 50);
        assert_eq!(config.sqlite_path, "/tmp/users.db");
        assert_eq!(config.redis_url, "redis://cache:6380");
        assert_eq!(config.invalidation_prefix, "user:list:");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("CACHE_TTL_SECONDS", "0"), ("CACHE_MAX_ENTRIES", "lots")]);

        assert_eq!(config.cache_ttl_seconds, 3600);
        assert_eq!(config.cache_max_entries.get(), 10_000);
    }

    #[test]
    fn test_repository_config() {
        let config = config_from(&[("CACHE_TTL_SECONDS", "90"), ("INVALIDATION_PREFIX", "")]);

        let repo = config.repository("user:email:{email}", "user:list:{limit}:{page}");

        assert_eq!(repo.cache_ttl_seconds, 90);
        assert_eq!(repo.invalidation_prefix(), None);
        assert_eq!(repo.entity_pattern, "user:email:{email}");
    }
}
