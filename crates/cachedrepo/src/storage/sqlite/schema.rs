//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Lookup and filter clauses are assembled from
//! [`USER_COLUMNS`] in `conversions`, so only whitelisted column names ever
//! reach the SQL text.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    bio TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
"#;

/// Columns that may appear in a lookup or filter.
pub const USER_COLUMNS: &[&str] = &[
    "id",
    "email",
    "name",
    "bio",
    "is_active",
    "created_at",
    "updated_at",
];

pub const SELECT_USER_COLUMNS: &str =
    "SELECT id, email, name, bio, is_active, created_at, updated_at FROM users";

pub const INSERT_USER: &str = r#"
INSERT INTO users (email, name, bio, is_active, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const UPDATE_USER: &str = r#"
UPDATE users
SET email = ?2, name = ?3, bio = ?4, is_active = ?5, updated_at = ?6
WHERE id = ?1
"#;

pub const DELETE_USER: &str = r#"
DELETE FROM users
WHERE id = ?1
"#;

pub const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_valid_sql() {
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(CREATE_TABLES.contains("email TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_queries_contain_expected_keywords() {
        assert!(INSERT_USER.contains("INSERT"));
        assert!(UPDATE_USER.contains("UPDATE"));
        assert!(DELETE_USER.contains("DELETE"));
        assert!(COUNT_USERS.contains("COUNT(*)"));
        for column in USER_COLUMNS {
            assert!(SELECT_USER_COLUMNS.contains(column));
        }
    }
}
