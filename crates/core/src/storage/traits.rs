use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::KeyValues;

use super::Result;

/// The four roles of an entity type managed by a cached repository.
///
/// The repository engine is written once against this trait. Implementors
/// describe how a stored row projects into the view that callers see and
/// the cache holds.
pub trait Entity: Send + Sync + 'static {
    /// Row representation owned by the durable store.
    type Record: Clone + Send + Sync + 'static;
    /// Validated input carrying everything needed to create a record.
    type Create: Send + Sync + 'static;
    /// Partial input; absent fields are left unchanged.
    type Update: Send + Sync + 'static;
    /// Externally visible projection, cached and returned to callers.
    type View: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Entity name used in errors and logs.
    const NAME: &'static str;

    /// Fields that may appear as placeholders in an entity key pattern.
    const KEY_FIELDS: &'static [&'static str];

    /// Projects a record into its view. No business logic belongs here.
    fn to_view(record: &Self::Record) -> Self::View;

    /// Returns the string form of a key field of `view`.
    ///
    /// Must return `Some` for every name in [`Entity::KEY_FIELDS`].
    fn key_field(view: &Self::View, field: &str) -> Option<String>;

    /// Validates a create input before any I/O happens.
    fn validate_create(_input: &Self::Create) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Validates an update input before any I/O happens.
    fn validate_update(_input: &Self::Update) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Durable store for one entity type.
///
/// Lookups take [`KeyValues`]: every entry is an equality condition on the
/// named field, compared against the string form [`Entity::key_field`]
/// reports for it. Other spellings of the same value (`01` for `1`) must be
/// rejected or left unmatched, never matched. Implementations must report
/// missing rows as `StoreError::NotFound` and uniqueness violations as
/// `StoreError::AlreadyExists`.
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    /// Inserts one record in its own transaction.
    async fn insert(&self, input: &E::Create) -> Result<E::Record>;

    /// Inserts every record in a single transaction. Either all rows are
    /// committed or none are.
    async fn insert_many(&self, inputs: &[E::Create]) -> Result<Vec<E::Record>>;

    /// Gets the first record (lowest primary key) matching every field.
    async fn get_by(&self, fields: &KeyValues) -> Result<E::Record>;

    /// Lists matching records ordered by primary key, skipping `offset`
    /// rows and returning at most `limit`.
    async fn list_by(&self, fields: &KeyValues, limit: u32, offset: u64)
        -> Result<Vec<E::Record>>;

    /// Applies the present fields of `changes` to the matching record and
    /// returns the persisted result.
    async fn update(&self, fields: &KeyValues, changes: &E::Update) -> Result<E::Record>;

    /// Deletes the matching record and returns it as it was.
    async fn delete(&self, fields: &KeyValues) -> Result<E::Record>;

    /// Counts records matching every field. An empty filter counts all rows.
    async fn count(&self, filter: &KeyValues) -> Result<u64>;
}
