//! SQLite store implementation.
//!
//! Implements [`Store<User>`] from `cachedrepo_core::storage` using SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tokio_rusqlite::Connection;

use cachedrepo_core::cache::KeyValues;
use cachedrepo_core::storage::{Result, Store, StoreError};
use cachedrepo_core::user::{apply_user_update, User, UserCreate, UserUpdate};

use super::conversions::{filter_clause, format_datetime, row_to_user};
use super::error::{map_rusqlite_error, map_tokio_rusqlite_error};
use super::schema;

const ENTITY: &str = "User";

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

fn insert_user(
    conn: &rusqlite::Connection,
    input: &UserCreate,
    now: chrono::DateTime<Utc>,
) -> rusqlite::Result<User> {
    let timestamp = format_datetime(&now);
    conn.execute(
        schema::INSERT_USER,
        rusqlite::params![
            input.email,
            input.name,
            input.bio,
            input.is_active,
            timestamp,
            timestamp
        ],
    )?;
    Ok(User::from_create(conn.last_insert_rowid(), input, now))
}

fn email_key(input: &UserCreate) -> String {
    format!("email={}", input.email)
}

/// SQLite-backed store for the demo [`User`] entity.
pub struct SqliteUserStore {
    conn: Connection,
}

impl SqliteUserStore {
    /// Creates a new store with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new store with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }
}

#[async_trait]
impl Store<User> for SqliteUserStore {
    async fn insert(&self, input: &UserCreate) -> Result<User> {
        let input = input.clone();
        let key = email_key(&input);

        self.conn
            .call(move |conn| insert_user(conn, &input, Utc::now()).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, key))
    }

    async fn insert_many(&self, inputs: &[UserCreate]) -> Result<Vec<User>> {
        let inputs = inputs.to_vec();

        // The inner result carries the per-row error so the failing email can
        // be reported; returning it still drops the transaction uncommitted.
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let now = Utc::now();
                let mut users = Vec::with_capacity(inputs.len());

                for input in &inputs {
                    match insert_user(&tx, input, now) {
                        Ok(user) => users.push(user),
                        Err(e) => {
                            return Ok(Err(map_rusqlite_error(&e, ENTITY, &email_key(input))));
                        }
                    }
                }

                tx.commit().map_err(wrap_err)?;
                Ok(Ok(users))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, ""))?
    }

    async fn get_by(&self, fields: &KeyValues) -> Result<User> {
        let (clause, params) = filter_clause(fields)?;
        let key = fields.to_string();
        let sql = format!("{}{clause} ORDER BY id ASC LIMIT 1", schema::SELECT_USER_COLUMNS);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                stmt.query_row(params_from_iter(params.iter()), row_to_user)
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, key))
    }

    async fn list_by(&self, fields: &KeyValues, limit: u32, offset: u64) -> Result<Vec<User>> {
        let (clause, mut params) = filter_clause(fields)?;
        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::InvalidData(format!("offset {offset} is out of range")))?;
        params.push(Value::Integer(i64::from(limit)));
        params.push(Value::Integer(offset));
        let sql = format!(
            "{}{clause} ORDER BY id ASC LIMIT ? OFFSET ?",
            schema::SELECT_USER_COLUMNS
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), row_to_user)
                    .map_err(wrap_err)?;

                let mut users = Vec::new();
                for row_result in rows {
                    users.push(row_result.map_err(wrap_err)?);
                }
                Ok(users)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, ""))
    }

    async fn update(&self, fields: &KeyValues, changes: &UserUpdate) -> Result<User> {
        let (clause, params) = filter_clause(fields)?;
        let key = fields.to_string();
        let changes = changes.clone();
        let sql = format!("{}{clause} ORDER BY id ASC LIMIT 1", schema::SELECT_USER_COLUMNS);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let mut user = {
                    let mut stmt = tx.prepare(&sql).map_err(wrap_err)?;
                    stmt.query_row(params_from_iter(params.iter()), row_to_user)
                        .map_err(wrap_err)?
                };
                apply_user_update(&mut user, &changes, Utc::now());

                tx.execute(
                    schema::UPDATE_USER,
                    rusqlite::params![
                        user.id,
                        user.email,
                        user.name,
                        user.bio,
                        user.is_active,
                        format_datetime(&user.updated_at)
                    ],
                )
                .map_err(wrap_err)?;

                tx.commit().map_err(wrap_err)?;
                Ok(user)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, key))
    }

    async fn delete(&self, fields: &KeyValues) -> Result<User> {
        let (clause, params) = filter_clause(fields)?;
        let key = fields.to_string();
        let sql = format!("{}{clause} ORDER BY id ASC LIMIT 1", schema::SELECT_USER_COLUMNS);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let user = tx
                    .query_row(&sql, params_from_iter(params.iter()), row_to_user)
                    .map_err(wrap_err)?;
                tx.execute(schema::DELETE_USER, [user.id]).map_err(wrap_err)?;

                tx.commit().map_err(wrap_err)?;
                Ok(user)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, key))
    }

    async fn count(&self, filter: &KeyValues) -> Result<u64> {
        let (clause, params) = filter_clause(filter)?;
        let sql = format!("{}{clause}", schema::COUNT_USERS);

        let count: i64 = self
            .conn
            .call(move |conn| {
                conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
                    .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, ENTITY, ""))?;

        u64::try_from(count).map_err(|_| StoreError::InvalidData(format!("negative count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteUserStore {
        SqliteUserStore::new_in_memory().await.unwrap()
    }

    fn by_email(email: &str) -> KeyValues {
        KeyValues::new().with("email", email)
    }

    async fn seed(store: &SqliteUserStore, n: usize) {
        for i in 0..n {
            store
                .insert(&UserCreate::new(format!("u{i}@example.com"), format!("User {i}")))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_by_email() {
        let store = store().await;
        let input = UserCreate::new("ada@example.com", "Ada").with_bio("Analyst");

        let created = store.insert(&input).await.unwrap();
        let fetched = store.get_by(&by_email("ada@example.com")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(fetched, created);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_get_by_id_and_flag() {
        let store = store().await;
        store
            .insert(&UserCreate::new("ada@example.com", "Ada").with_active(false))
            .await
            .unwrap();

        let fields = KeyValues::new().with("id", 1).with("is_active", false);
        let user = store.get_by(&fields).await.unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_get_by_missing_is_not_found() {
        let store = store().await;

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
    async fn test_duplicate_email_is_already_exists() {
        let store = store().await;
        store
            .insert(&UserCreate::new("ada@example.com", "Ada"))
            .await
            .unwrap();

        let err = store
            .insert(&UserCreate::new("ada@example.com", "Someone else"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::AlreadyExists {
                entity_type: "User",
                key: "email=ada@example.com".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_insert_many_rolls_back_on_conflict() {
        let store = store().await;
        store
            .insert(&UserCreate::new("taken@example.com", "Taken"))
            .await
            .unwrap();

        let inputs = vec![
            UserCreate::new("fresh@example.com", "Fresh"),
            UserCreate::new("taken@example.com", "Again"),
        ];
        let err = store.insert_many(&inputs).await.unwrap_err();

        assert_eq!(
            err,
            StoreError::AlreadyExists {
                entity_type: "User",
                key: "email=taken@example.com".to_string(),
            }
        );
        assert_eq!(store.count(&KeyValues::new()).await.unwrap(), 1);
        assert!(store.get_by(&by_email("fresh@example.com")).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_many_commits_all() {
        let store = store().await;
        let inputs = vec![
            UserCreate::new("a@example.com", "A"),
            UserCreate::new("b@example.com", "B"),
            UserCreate::new("c@example.com", "C"),
        ];

        let users = store.insert_many(&inputs).await.unwrap();

        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(store.count(&KeyValues::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_by_pages_in_id_order() {
        let store = store().await;
        seed(&store, 12).await;

        let second = store.list_by(&KeyValues::new(), 5, 5).await.unwrap();
        let last = store.list_by(&KeyValues::new(), 5, 10).await.unwrap();
        let beyond = store.list_by(&KeyValues::new(), 5, 15).await.unwrap();

        assert_eq!(
            second.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![6, 7, 8, 9, 10]
        );
        assert_eq!(last.len(), 2);
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_count_with_filter() {
        let store = store().await;
        seed(&store, 3).await;
        store
            .insert(&UserCreate::new("off@example.com", "Off").with_active(false))
            .await
            .unwrap();

        let active = KeyValues::new().with("is_active", true);

        assert_eq!(store.list_by(&active, 10, 0).await.unwrap().len(), 3);
        assert_eq!(store.count(&active).await.unwrap(), 3);
        assert_eq!(store.count(&KeyValues::new()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_unknown_column_is_invalid_data() {
        let store = store().await;

        let err = store
            .count(&KeyValues::new().with("phone", "555"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let store = store().await;
        let created = store
            .insert(&UserCreate::new("ada@example.com", "Ada").with_bio("Analyst"))
            .await
            .unwrap();

        let updated = store
            .update(&by_email("ada@example.com"), &UserUpdate::new().with_name("Augusta"))
            .await
            .unwrap();
        let fetched = store.get_by(&KeyValues::new().with("id", created.id)).await.unwrap();

        assert_eq!(updated.name, "Augusta");
        assert_eq!(updated.bio.as_deref(), Some("Analyst"));
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = store().await;

        let err = store
            .update(&by_email("nobody@example.com"), &UserUpdate::new().with_name("X"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_already_exists() {
        let store = store().await;
        seed(&store, 2).await;

        let err = store
            .update(
                &by_email("u1@example.com"),
                &UserUpdate::new().with_email("u0@example.com"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert!(store.get_by(&by_email("u1@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store().await;
        seed(&store, 2).await;

        let deleted = store.delete(&by_email("u0@example.com")).await.unwrap();

        assert_eq!(deleted.email, "u0@example.com");
        assert_eq!(store.count(&KeyValues::new()).await.unwrap(), 1);
        let err = store.delete(&by_email("u0@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_database_persists_between_connections() {
        let path = std::env::temp_dir().join(format!("cachedrepo-{}.db", uuid::Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();

        {
            let store = SqliteUserStore::new(&path_str).await.unwrap();
            store
                .insert(&UserCreate::new("ada@example.com", "Ada"))
                .await
                .unwrap();
        }

        let reopened = SqliteUserStore::new(&path_str).await.unwrap();
        assert_eq!(reopened.count(&KeyValues::new()).await.unwrap(), 1);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }
}
