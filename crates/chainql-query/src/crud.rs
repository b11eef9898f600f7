//! Statement builders for single-row writes and key lookups
//!
//! Inserts and updates bind the whole row to one `SET ?` placeholder and
//! leave the expansion to the execution client.

use chainql_core::{Error, Key, Result, Row};
use serde::Serialize;
use serde_json::Value;

pub fn insert_statement(table: &str) -> String {
    format!("INSERT INTO {} SET ?", table)
}

pub fn update_statement(table: &str, key_column: &str, key_sql: &str) -> String {
    format!("UPDATE {} SET ? WHERE {}={}", table, key_column, key_sql)
}

pub fn delete_statement(table: &str, key_column: &str, key_sql: &str) -> String {
    format!("DELETE FROM {} WHERE {}={}", table, key_column, key_sql)
}

pub fn find_statement(table: &str, key_column: &str, key_sql: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {}={} LIMIT 1",
        table, key_column, key_sql
    )
}

/// Render a key for SQL text; text keys go through `escape`
pub fn key_literal(key: &Key, escape: impl Fn(&Value) -> String) -> String {
    match key {
        Key::Integer(n) => n.to_string(),
        Key::Text(_) => escape(&key.to_value()),
    }
}

/// Serialize an entity into the column map bound to `SET ?`
pub fn to_row<T: Serialize>(entity: &T) -> Result<Row> {
    match serde_json::to_value(entity)? {
        Value::Object(row) => Ok(row),
        other => Err(Error::InvalidArgument(format!(
            "entity must serialize to an object, got {}",
            other
        ))),
    }
}

/// Read the key column out of a serialized row
pub fn key_of(row: &Row, key_column: &str) -> Result<Key> {
    let value = row.get(key_column).ok_or_else(|| {
        Error::InvalidArgument(format!("row has no '{}' column", key_column))
    })?;
    Key::from_value(value).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "column '{}' holds {}, expected an integer or string key",
            key_column, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::escape_literal;

    #[derive(Serialize)]
    struct Post {
        id: i64,
        title: String,
    }

    #[test]
    fn test_statements() {
        assert_eq!(insert_statement("posts"), "INSERT INTO posts SET ?");
        assert_eq!(
            update_statement("posts", "id", "7"),
            "UPDATE posts SET ? WHERE id=7"
        );
        assert_eq!(
            delete_statement("posts", "id", "7"),
            "DELETE FROM posts WHERE id=7"
        );
        assert_eq!(
            find_statement("users", "login", "'ann'"),
            "SELECT * FROM users WHERE login='ann' LIMIT 1"
        );
    }

    #[test]
    fn test_key_literal() {
        assert_eq!(key_literal(&Key::from(42), escape_literal), "42");
        assert_eq!(key_literal(&Key::from("o'neil"), escape_literal), "'o\\'neil'");
    }

    #[test]
    fn test_to_row_and_key() {
        let row = to_row(&Post {
            id: 3,
            title: "Hello".to_string(),
        })
        .unwrap();
        assert_eq!(row["title"], "Hello");
        assert_eq!(key_of(&row, "id").unwrap(), Key::Integer(3));
        assert!(matches!(key_of(&row, "slug"), Err(Error::InvalidArgument(_))));
        assert!(matches!(key_of(&row, "title"), Ok(Key::Text(_))));
    }

    #[test]
    fn test_non_object_entity_rejected() {
        assert!(matches!(to_row(&5), Err(Error::InvalidArgument(_))));
    }
}
