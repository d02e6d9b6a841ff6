use chrono::{DateTime, Utc};

use cachedrepo_core::storage::Entity;
use cachedrepo_core::user::{apply_user_update, User, UserCreate, UserUpdate};

/// Row-level knowledge the in-memory store needs about an entity.
///
/// Values are compared in their string form, the same form used in
/// [`KeyValues`](cachedrepo_core::cache::KeyValues).
pub trait MemoryEntity: Entity {
    /// Every column that may appear in a lookup or filter.
    const FIELDS: &'static [&'static str];

    /// Columns whose values must be unique across all rows.
    const UNIQUE_FIELDS: &'static [&'static str];

    /// Builds the row for `input` under a freshly assigned `id`.
    fn new_record(id: i64, input: &Self::Create, now: DateTime<Utc>) -> Self::Record;

    fn record_id(record: &Self::Record) -> i64;

    /// String form of a column. `None` for a null value.
    fn record_field(record: &Self::Record, field: &str) -> Option<String>;

    /// Applies the present fields of `changes` in place.
    fn apply_update(record: &mut Self::Record, changes: &Self::Update, now: DateTime<Utc>);
}

impl MemoryEntity for User {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "email",
        "name",
        "bio",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];

    fn new_record(id: i64, input: &UserCreate, now: DateTime<Utc>) -> User {
        User::from_create(id, input, now)
    }

    fn record_id(record: &User) -> i64 {
        record.id
    }

    fn record_field(record: &User, field: &str) -> Option<String> {
        match field {
            "id" => Some(record.id.to_string()),
            "email" => Some(record.email.clone()),
            "name" => Some(record.name.clone()),
            "bio" => record.bio.clone(),
            "is_active" => Some(record.is_active.to_string()),
            "created_at" => Some(record.created_at.to_rfc3339()),
            "updated_at" => Some(record.updated_at.to_rfc3339()),
            _ => None,
        }
    }

    fn apply_update(record: &mut User, changes: &UserUpdate, now: DateTime<Utc>) {
        apply_user_update(record, changes, now);
    }
}
