//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows, lookup values and
//! domain types. These are testable in isolation without database access.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;

use cachedrepo_core::cache::KeyValues;
use cachedrepo_core::storage::StoreError;
use cachedrepo_core::user::User;

use super::schema::USER_COLUMNS;

/// Convert a SQLite row to a User.
///
/// Expected columns: id, email, name, bio, is_active, created_at, updated_at
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        bio: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(5, &created_at)?,
        updated_at: parse_datetime(6, &updated_at)?,
    })
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Format a DateTime for SQLite storage (RFC 3339).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Converts one lookup value into the SQLite value of `column`.
///
/// Only the spelling a view reports for the field is accepted (`7`, not
/// `07`; `true`, not `1`), so a row can only be matched through the same
/// string its cache key is rendered from.
fn column_value(column: &str, value: &str) -> Result<Value, StoreError> {
    match column {
        "id" => value
            .parse::<i64>()
            .ok()
            .filter(|id| id.to_string() == value)
            .map(Value::Integer)
            .ok_or_else(|| {
                StoreError::InvalidData(format!("id must be an integer, got '{value}'"))
            }),
        "is_active" => match value {
            "true" => Ok(Value::Integer(1)),
            "false" => Ok(Value::Integer(0)),
            _ => Err(StoreError::InvalidData(format!(
                "is_active must be true or false, got '{value}'"
            ))),
        },
        _ => Ok(Value::Text(value.to_string())),
    }
}

/// Builds a ` WHERE a = ? AND b = ?` clause and its parameters.
///
/// Returns an empty clause for empty `fields`. Column names are checked
/// against the whitelist before they are spliced into the SQL.
pub fn filter_clause(fields: &KeyValues) -> Result<(String, Vec<Value>), StoreError> {
    let mut conditions = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len());

    for (name, value) in fields.iter() {
        let Some(column) = USER_COLUMNS.iter().find(|c| **c == name) else {
            return Err(StoreError::InvalidData(format!(
                "unknown column '{name}' for User"
            )));
        };
        conditions.push(format!("{column} = ?"));
        params.push(column_value(column, value)?);
    }

    if conditions.is_empty() {
        Ok((String::new(), params))
    } else {
        Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap();
        let formatted = format_datetime(&dt);
        assert_eq!(parse_datetime(0, &formatted).unwrap(), dt);
    }

    #[test]
    fn test_invalid_datetime() {
        assert!(parse_datetime(5, "yesterday").is_err());
    }

    #[test]
    fn test_empty_filter() {
        let (clause, params) = filter_clause(&KeyValues::new()).unwrap();
        assert_eq!(clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_filter_clause_typed_params() {
        let fields = KeyValues::new()
            .with("email", "ada@example.com")
            .with("id", 3)
            .with("is_active", true);

        let (clause, params) = filter_clause(&fields).unwrap();

        // KeyValues iterates by name.
        assert_eq!(clause, " WHERE email = ? AND id = ? AND is_active = ?");
        assert_eq!(
            params,
            vec![
                Value::Text("ada@example.com".to_string()),
                Value::Integer(3),
                Value::Integer(1),
            ]
        );
    }

    #[test]
    fn test_filter_clause_rejects_unknown_column() {
        let fields = KeyValues::new().with("email; DROP TABLE users", "x");
        assert!(matches!(
            filter_clause(&fields),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_filter_clause_rejects_bad_values() {
        assert!(filter_clause(&KeyValues::new().with("id", "abc")).is_err());
        assert!(filter_clause(&KeyValues::new().with("is_active", "yes")).is_err());
    }

    #[test]
    fn test_filter_clause_rejects_alternate_spellings() {
        let spellings = [
            ("id", "01"),
            ("id", "+1"),
            ("id", " 1"),
            ("is_active", "1"),
            ("is_active", "0"),
        ];
        for (column, value) in spellings {
            let fields = KeyValues::new().with(column, value);
            assert!(
                matches!(filter_clause(&fields), Err(StoreError::InvalidData(_))),
                "{column}={value:?} should be rejected"
            );
        }
    }
}
