//! In-memory store implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cachedrepo_core::cache::KeyValues;
use cachedrepo_core::storage::{Result, Store, StoreError};

use super::entity::MemoryEntity;

struct Table<R> {
    rows: BTreeMap<i64, R>,
    next_id: i64,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory storage backend for testing.
///
/// A single `RwLock` guards the whole table, so every operation, including
/// `insert_many`, is atomic. Data is lost when the last clone is dropped.
pub struct InMemoryStore<E: MemoryEntity> {
    table: Arc<RwLock<Table<E::Record>>>,
}

impl<E: MemoryEntity> Clone for InMemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<E: MemoryEntity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MemoryEntity> InMemoryStore<E> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Table::default())),
        }
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

fn check_fields<E: MemoryEntity>(fields: &KeyValues) -> Result<()> {
    match fields.names().find(|name| !E::FIELDS.contains(name)) {
        Some(unknown) => Err(StoreError::InvalidData(format!(
            "unknown column '{unknown}' for {}",
            E::NAME
        ))),
        None => Ok(()),
    }
}

fn matches<E: MemoryEntity>(record: &E::Record, fields: &KeyValues) -> bool {
    fields
        .iter()
        .all(|(name, value)| E::record_field(record, name).as_deref() == Some(value))
}

fn first_match<E: MemoryEntity>(
    rows: &BTreeMap<i64, E::Record>,
    fields: &KeyValues,
) -> Result<i64> {
    rows.values()
        .find(|record| matches::<E>(record, fields))
        .map(E::record_id)
        .ok_or_else(|| StoreError::NotFound {
            entity_type: E::NAME,
            key: fields.to_string(),
        })
}

/// Fails with `AlreadyExists` if `candidate` collides on a unique field with
/// any row in `rows` other than itself.
fn check_unique<'a, E: MemoryEntity>(
    candidate: &E::Record,
    rows: impl IntoIterator<Item = &'a E::Record>,
) -> Result<()> {
    let candidate_id = E::record_id(candidate);
    for other in rows {
        if E::record_id(other) == candidate_id {
            continue;
        }
        for field in E::UNIQUE_FIELDS {
            let value = E::record_field(candidate, field);
            if value.is_some() && value == E::record_field(other, field) {
                return Err(StoreError::AlreadyExists {
                    entity_type: E::NAME,
                    key: format!("{field}={}", value.unwrap_or_default()),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<E: MemoryEntity> Store<E> for InMemoryStore<E> {
    async fn insert(&self, input: &E::Create) -> Result<E::Record> {
        let mut table = self.table.write().await;
        let record = E::new_record(table.next_id, input, Utc::now());
        check_unique::<E>(&record, table.rows.values())?;

        table.next_id += 1;
        table.rows.insert(E::record_id(&record), record.clone());
        Ok(record)
    }

    async fn insert_many(&self, inputs: &[E::Create]) -> Result<Vec<E::Record>> {
        let mut table = self.table.write().await;
        let now = Utc::now();

        let mut batch: Vec<E::Record> = Vec::with_capacity(inputs.len());
        for (offset, input) in inputs.iter().enumerate() {
            let record = E::new_record(table.next_id + offset as i64, input, now);
            check_unique::<E>(&record, table.rows.values().chain(batch.iter()))?;
            batch.push(record);
        }

        table.next_id += batch.len() as i64;
        for record in &batch {
            table.rows.insert(E::record_id(record), record.clone());
        }
        Ok(batch)
    }

    async fn get_by(&self, fields: &KeyValues) -> Result<E::Record> {
        check_fields::<E>(fields)?;
        let table = self.table.read().await;
        let id = first_match::<E>(&table.rows, fields)?;
        table.rows.get(&id).cloned().ok_or_else(|| StoreError::NotFound {
            entity_type: E::NAME,
            key: fields.to_string(),
        })
    }

    async fn list_by(
        &self,
        fields: &KeyValues,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<E::Record>> {
        check_fields::<E>(fields)?;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|record| matches::<E>(record, fields))
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn update(&self, fields: &KeyValues, changes: &E::Update) -> Result<E::Record> {
        check_fields::<E>(fields)?;
        let mut table = self.table.write().await;
        let id = first_match::<E>(&table.rows, fields)?;

        let mut updated = match table.rows.get(&id) {
            Some(current) => current.clone(),
            None => {
                return Err(StoreError::NotFound {
                    entity_type: E::NAME,
                    key: fields.to_string(),
                })
            }
        };
        E::apply_update(&mut updated, changes, Utc::now());
        check_unique::<E>(&updated, table.rows.values())?;

        table.rows.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, fields: &KeyValues) -> Result<E::Record> {
        check_fields::<E>(fields)?;
        let mut table = self.table.write().await;
        let id = first_match::<E>(&table.rows, fields)?;
        table.rows.remove(&id).ok_or_else(|| StoreError::NotFound {
            entity_type: E::NAME,
            key: fields.to_string(),
        })
    }

    async fn count(&self, filter: &KeyValues) -> Result<u64> {
        check_fields::<E>(filter)?;
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|record| matches::<E>(record, filter))
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachedrepo_core::user::{User, UserCreate, UserUpdate};

    fn store() -> InMemoryStore<User> {
        InMemoryStore::new()
    }

    fn by_email(email: &str) -> KeyValues {
        KeyValues::new().with("email", email)
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = store();

        let first = store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();
        let second = store
            .insert(&UserCreate::new("alan@example.com", "Alan"))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_insert_duplicate_email() {
        let store = store();
        store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();

        let err = store
            .insert(&UserCreate::new("ada@example.com", "Other"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::AlreadyExists {
                entity_type: "User",
                key: "email=ada@example.com".to_string(),
            }
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_many_is_all_or_nothing() {
        let store = store();
        store
            .insert(&UserCreate::new("taken@example.com", "Taken"))
            .await
            .unwrap();

        let inputs = vec![
            UserCreate::new("a@example.com", "A"),
            UserCreate::new("taken@example.com", "B"),
        ];
        let err = store.insert_many(&inputs).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_many_rejects_duplicates_within_batch() {
        let store = store();
        let inputs = vec![
            UserCreate::new("same@example.com", "A"),
            UserCreate::new("same@example.com", "B"),
        ];

        assert!(store.insert_many(&inputs).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_many_commits_in_order() {
        let store = store();
        let inputs = vec![
            UserCreate::new("a@example.com", "A"),
            UserCreate::new("b@example.com", "B"),
        ];

        let records = store.insert_many(&inputs).await.unwrap();

        assert_eq!(records.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
        let next = store
            .insert(&UserCreate::new("c@example.com", "C"))
            .await
            .unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_get_by_and_not_found() {
        let store = store();
        store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();

        let user = store.get_by(&by_email("ada@example.com")).await.unwrap();
        assert_eq!(user.name, "Ada");

        let err = store.get_by(&by_email("nobody@example.com")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                entity_type: "User",
                key: "email=nobody@example.com".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_column_is_invalid_data() {
        let store = store();
        let err = store
            .get_by(&KeyValues::new().with("phone", "555"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_list_by_slices_in_id_order() {
        let store = store();
        for i in 0..7 {
            store
                .insert(&UserCreate::new(format!("u{i}@example.com"), format!("U{i}")))
                .await
                .unwrap();
        }

        let page = store.list_by(&KeyValues::new(), 3, 3).await.unwrap();
        assert_eq!(page.iter().map(|u| u.id).collect::<Vec<_>>(), vec![4, 5, 6]);

        let tail = store.list_by(&KeyValues::new(), 3, 6).await.unwrap();
        assert_eq!(tail.len(), 1);

        let beyond = store.list_by(&KeyValues::new(), 3, 30).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_count_with_filter() {
        let store = store();
        store
            .insert(&UserCreate::new("a@example.com", "A"))
            .await
            .unwrap();
        store
            .insert(&UserCreate::new("b@example.com", "B").with_active(false))
            .await
            .unwrap();

        let inactive = KeyValues::new().with("is_active", false);
        let listed = store.list_by(&inactive, 10, 0).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].email, "b@example.com");
        assert_eq!(store.count(&inactive).await.unwrap(), 1);
        assert_eq!(store.count(&KeyValues::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_applies_changes() {
        let store = store();
        let created = store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();

        let updated = store
            .update(&by_email("ada@example.com"), &UserUpdate::new().with_bio("Analyst"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.bio.as_deref(), Some("Analyst"));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_to_taken_email_fails() {
        let store = store();
        store
            .insert(&UserCreate::new("a@example.com", "A"))
            .await
            .unwrap();
        store
            .insert(&UserCreate::new("b@example.com", "B"))
            .await
            .unwrap();

        let err = store
            .update(
                &by_email("b@example.com"),
                &UserUpdate::new().with_email("a@example.com"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert!(store.get_by(&by_email("b@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store();
        store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();

        let deleted = store.delete(&by_email("ada@example.com")).await.unwrap();

        assert_eq!(deleted.name, "Ada");
        assert!(store.is_empty().await);
        let err = store.delete(&by_email("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
