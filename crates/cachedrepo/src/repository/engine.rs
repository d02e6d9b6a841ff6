use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use cachedrepo_core::cache::{
    deserialize_value, serialize_value, Cache, KeyPatterns, KeyValues, LIMIT_PLACEHOLDER,
    PAGE_PLACEHOLDER,
};
use cachedrepo_core::pagination::{paginate, Page, PageRequest};
use cachedrepo_core::repository::{
    translate_store_error, InvalidationMode, RepoError, RepositoryConfig, Result,
};
use cachedrepo_core::storage::{Entity, Store};

/// Generic cache-aside repository for entity type `E`.
///
/// Single entities are written through to the cache on every successful
/// write. List pages are cached as whole [`Page`] envelopes and go stale
/// only until their TTL passes or the invalidation prefix clears them.
///
/// # Example
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use std::sync::Arc;
///
/// use cachedrepo::cache::MemoryCache;
/// use cachedrepo::repository::CachedRepository;
/// use cachedrepo::storage::InMemoryStore;
/// use cachedrepo_core::cache::KeyValues;
/// use cachedrepo_core::repository::{InvalidationMode, RepositoryConfig};
/// use cachedrepo_core::user::{User, UserCreate};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RepositoryConfig::new("user:email:{email}", "user:list:{limit}:{page}")
///     .with_invalidation_mode(InvalidationMode::Inline);
/// let users = CachedRepository::<User>::new(
///     Arc::new(InMemoryStore::<User>::new()),
///     Arc::new(MemoryCache::new(NonZeroUsize::new(100).unwrap())),
///     &config,
/// )
/// .unwrap();
///
/// users.create(UserCreate::new("ada@example.com", "Ada")).await.unwrap();
/// let ada = users
///     .get(&KeyValues::new().with("email", "ada@example.com"))
///     .await
///     .unwrap();
/// assert_eq!(ada.name, "Ada");
/// # }
/// ```
pub struct CachedRepository<E: Entity> {
    store: Arc<dyn Store<E>>,
    cache: Arc<dyn Cache>,
    patterns: KeyPatterns,
    ttl: Duration,
    invalidation_prefix: Option<String>,
    invalidation: InvalidationMode,
}

impl<E: Entity> CachedRepository<E> {
    /// Creates a repository over `store` and `cache`.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Configuration` if the TTL is zero, if either key
    /// pattern is malformed or names a field `E` does not expose, or if the
    /// invalidation prefix could match entity keys.
    pub fn new(
        store: Arc<dyn Store<E>>,
        cache: Arc<dyn Cache>,
        config: &RepositoryConfig,
    ) -> Result<Self> {
        let patterns = config.compile::<E>()?;

        tracing::info!(
            entity = E::NAME,
            entity_pattern = %patterns.entity(),
            list_pattern = %patterns.list(),
            ttl_seconds = config.cache_ttl_seconds,
            invalidation_prefix = config.invalidation_prefix().unwrap_or(""),
            "Cached repository ready"
        );

        Ok(Self {
            store,
            cache,
            patterns,
            ttl: config.cache_ttl(),
            invalidation_prefix: config.invalidation_prefix().map(str::to_string),
            invalidation: config.invalidation,
        })
    }

    /// Validates and persists `input`, then caches its view.
    #[tracing::instrument(skip_all, fields(entity = E::NAME))]
    pub async fn create(&self, input: E::Create) -> Result<E::View> {
        E::validate_create(&input).map_err(|message| RepoError::Validation {
            entity_type: E::NAME,
            message,
        })?;

        let record = self
            .store
            .insert(&input)
            .await
            .map_err(|e| translate_store_error(e, &KeyValues::new()))?;

        let view = E::to_view(&record);
        let key = self.view_key(&view)?;
        self.cache_write(&key, &view).await;
        self.invalidate().await;

        tracing::debug!(%key, "Created");
        Ok(view)
    }

    /// Persists every input in a single store transaction.
    ///
    /// All inputs are validated before any I/O; a failure names the index of
    /// the offending item. If any row collides on a unique field nothing is
    /// committed and nothing is cached.
    #[tracing::instrument(skip_all, fields(entity = E::NAME, count = inputs.len()))]
    pub async fn create_multi(&self, inputs: Vec<E::Create>) -> Result<Vec<E::View>> {
        for (index, input) in inputs.iter().enumerate() {
            E::validate_create(input).map_err(|message| RepoError::Validation {
                entity_type: E::NAME,
                message: format!("item {index}: {message}"),
            })?;
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let records = self
            .store
            .insert_many(&inputs)
            .await
            .map_err(|e| translate_store_error(e, &KeyValues::new()))?;

        let views: Vec<E::View> = records.iter().map(E::to_view).collect();
        for view in &views {
            let key = self.view_key(view)?;
            self.cache_write(&key, view).await;
        }
        self.invalidate().await;

        tracing::debug!(created = views.len(), "Created batch");
        Ok(views)
    }

    /// Returns the entity identified by `key_values`, from the cache when
    /// possible.
    ///
    /// `key_values` must name exactly the placeholders of the entity key
    /// pattern.
    #[tracing::instrument(skip_all, fields(entity = E::NAME, lookup = %key_values))]
    pub async fn get(&self, key_values: &KeyValues) -> Result<E::View> {
        let key = self.entity_key(key_values)?;

        if let Some(view) = self.cache_read::<E::View>(&key).await {
            return Ok(view);
        }

        let record = self
            .store
            .get_by(key_values)
            .await
            .map_err(|e| translate_store_error(e, key_values))?;

        // Repair under the key writes maintain, never under the lookup's own
        // spelling of it.
        let view = E::to_view(&record);
        let canonical = self.view_key(&view)?;
        if canonical != key {
            tracing::debug!(%key, %canonical, "Lookup does not render the entity key");
        }
        self.cache_write(&canonical, &view).await;
        Ok(view)
    }

    /// Returns page `page` (1-indexed) of at most `limit` entities matching
    /// `filters`, ordered by primary key.
    ///
    /// Every filter must be a placeholder of the list key pattern, so that
    /// differently filtered pages never share a cache key.
    #[tracing::instrument(
        skip_all,
        fields(entity = E::NAME, limit = limit, page = page, filters = %filters)
    )]
    pub async fn get_multi(
        &self,
        limit: u32,
        page: u32,
        filters: &KeyValues,
    ) -> Result<Page<E::View>> {
        let request = PageRequest::new(limit, page)?;
        self.check_list_filters(filters)?;
        let key = self
            .patterns
            .list_key(filters, request.limit(), request.page())?;

        if let Some(cached) = self.cache_read::<Page<E::View>>(&key).await {
            return Ok(cached);
        }

        let records = self
            .store
            .list_by(filters, request.limit(), request.offset())
            .await
            .map_err(|e| translate_store_error(e, filters))?;

        let views = records.iter().map(E::to_view).collect();
        let envelope = paginate(views, request.limit(), request.page())?;
        self.cache_write(&key, &envelope).await;
        Ok(envelope)
    }

    /// Applies the present fields of `input` to the entity identified by
    /// `key_values` and writes the result through to the cache.
    ///
    /// If the update changes a field the entity key is built from, the entry
    /// under the old key is removed.
    #[tracing::instrument(skip_all, fields(entity = E::NAME, lookup = %key_values))]
    pub async fn update(&self, key_values: &KeyValues, input: E::Update) -> Result<E::View> {
        E::validate_update(&input).map_err(|message| RepoError::Validation {
            entity_type: E::NAME,
            message,
        })?;
        let old_key = self.entity_key(key_values)?;

        let record = self
            .store
            .update(key_values, &input)
            .await
            .map_err(|e| translate_store_error(e, key_values))?;

        let view = E::to_view(&record);
        let new_key = self.view_key(&view)?;
        self.cache_write(&new_key, &view).await;
        if new_key != old_key {
            self.cache_delete(&old_key).await;
        }
        self.invalidate().await;

        tracing::debug!(key = %new_key, "Updated");
        Ok(view)
    }

    /// Deletes the entity identified by `key_values` and its cache entry.
    #[tracing::instrument(skip_all, fields(entity = E::NAME, lookup = %key_values))]
    pub async fn delete(&self, key_values: &KeyValues) -> Result<()> {
        let key = self.entity_key(key_values)?;

        let record = self
            .store
            .delete(key_values)
            .await
            .map_err(|e| translate_store_error(e, key_values))?;

        let canonical = self.view_key(&E::to_view(&record))?;
        self.cache_delete(&canonical).await;
        if canonical != key {
            self.cache_delete(&key).await;
        }
        self.invalidate().await;

        tracing::debug!(key = %canonical, "Deleted");
        Ok(())
    }

    /// Counts entities matching `filter`. Always answered by the store.
    #[tracing::instrument(skip_all, fields(entity = E::NAME, filter = %filter))]
    pub async fn count(&self, filter: &KeyValues) -> Result<u64> {
        self.store
            .count(filter)
            .await
            .map_err(|e| translate_store_error(e, filter))
    }

    /// Wraps already-fetched data in a page envelope without slicing it.
    pub fn paginate<T>(&self, data: Vec<T>, limit: u32, page: u32) -> Result<Page<T>> {
        Ok(paginate(data, limit, page)?)
    }

    /// Renders the entity key for caller-supplied lookup values.
    fn entity_key(&self, key_values: &KeyValues) -> Result<String> {
        let pattern = self.patterns.entity();
        if let Some(name) = key_values.names().find(|name| !pattern.has_placeholder(name)) {
            return Err(RepoError::InvalidArgument(format!(
                "'{name}' is not a placeholder of {} key pattern '{pattern}'",
                E::NAME
            )));
        }
        Ok(self.patterns.entity_key(key_values)?)
    }

    /// Renders the entity key from the key fields of a view.
    fn view_key(&self, view: &E::View) -> Result<String> {
        let mut values = KeyValues::new();
        for field in self.patterns.entity().placeholders() {
            let value = E::key_field(view, field).ok_or_else(|| {
                RepoError::Configuration(format!("{} does not expose key field '{field}'", E::NAME))
            })?;
            values.insert(field, value);
        }
        Ok(self.patterns.entity_key(&values)?)
    }

    fn check_list_filters(&self, filters: &KeyValues) -> Result<()> {
        for name in filters.names() {
            if name == LIMIT_PLACEHOLDER || name == PAGE_PLACEHOLDER {
                return Err(RepoError::InvalidArgument(format!(
                    "'{name}' is reserved for pagination and cannot be used as a filter"
                )));
            }
            if !self.patterns.list().has_placeholder(name) {
                return Err(RepoError::InvalidArgument(format!(
                    "filter '{name}' is not a placeholder of {} list pattern '{}'",
                    E::NAME,
                    self.patterns.list()
                )));
            }
        }
        Ok(())
    }

    async fn cache_read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(entity = E::NAME, key, error = %err, "Cache read failed");
                return None;
            }
        };

        match deserialize_value(&bytes) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(err) => {
                tracing::warn!(
                    entity = E::NAME,
                    key,
                    error = %err,
                    "Cached value could not be decoded, treating as miss"
                );
                None
            }
        }
    }

    async fn cache_write<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serialize_value(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(entity = E::NAME, key, error = %err, "Failed to encode cache value");
                return;
            }
        };

        match self.cache.set(key, &bytes, Some(self.ttl)).await {
            Ok(()) => tracing::debug!(key, "Cached"),
            Err(err) => {
                tracing::warn!(entity = E::NAME, key, error = %err, "Failed to write cache entry")
            }
        }
    }

    async fn cache_delete(&self, key: &str) {
        if let Err(err) = self.cache.delete(key).await {
            tracing::warn!(entity = E::NAME, key, error = %err, "Failed to delete cache entry");
        }
    }

    /// Clears every cache key under the invalidation prefix, if one is set.
    async fn invalidate(&self) {
        let Some(prefix) = self.invalidation_prefix.clone() else {
            return;
        };

        match self.invalidation {
            InvalidationMode::Inline => {
                if let Err(err) = self.cache.delete_prefix(&prefix).await {
                    tracing::warn!(
                        entity = E::NAME,
                        %prefix,
                        error = %err,
                        "Failed to invalidate cache prefix"
                    );
                }
            }
            InvalidationMode::Background => {
                let cache = Arc::clone(&self.cache);
                tokio::spawn(async move {
                    if let Err(err) = cache.delete_prefix(&prefix).await {
                        tracing::error!(
                            entity = E::NAME,
                            %prefix,
                            error = %err,
                            "Background cache invalidation failed"
                        );
                    }
                });
            }
        }
    }
}
