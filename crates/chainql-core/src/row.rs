//! Row and key values exchanged with the execution client

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A result row or a parameter object, keyed by column name
pub type Row = serde_json::Map<String, Value>;

/// Primary key value used by the per-set lookup helpers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Integer(i64),
    Text(String),
}

impl Key {
    /// Reads a key out of a JSON value; only integers and strings qualify
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Key::Integer),
            Value::String(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Integer(n) => Value::from(*n),
            Key::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(n) => write!(f, "{}", n),
            Key::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Integer(value as i64)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Integer(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    /// Rows inserted, updated or deleted
    pub affected_rows: u64,

    /// Generated key of an inserted row, when the engine reports one
    pub insert_id: Option<u64>,
}

impl ExecOutcome {
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            insert_id: None,
        }
    }

    pub fn inserted(insert_id: u64) -> Self {
        Self {
            affected_rows: 1,
            insert_id: Some(insert_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_value() {
        assert_eq!(Key::from_value(&json!(42)), Some(Key::Integer(42)));
        assert_eq!(
            Key::from_value(&json!("u-7")),
            Some(Key::Text("u-7".to_string()))
        );
        assert_eq!(Key::from_value(&json!(1.5)), None);
        assert_eq!(Key::from_value(&json!(null)), None);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from(12).to_string(), "12");
        assert_eq!(Key::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_outcome_constructors() {
        let outcome = ExecOutcome::inserted(9);
        assert_eq!(outcome.affected_rows, 1);
        assert_eq!(outcome.insert_id, Some(9));
        assert_eq!(ExecOutcome::affected(3).insert_id, None);
    }
}
