//! Serialization utilities
//!
//! This module converts request-side JSON values into SQL values.

use crate::errors::TypeError;
use crate::types::SqlValue;

/// Convert a JSON scalar into a SQL parameter value
///
/// Arrays and objects have no column representation and are rejected.
pub fn json_to_sql(value: &serde_json::Value) -> Result<SqlValue, TypeError> {
    match value {
        serde_json::Value::Null => Ok(SqlValue::Null),
        serde_json::Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Float(f))
            } else {
                Err(TypeError::UnsupportedJson(n.to_string()))
            }
        }
        serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(TypeError::UnsupportedJson(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalars() {
        assert_eq!(json_to_sql(&json!(3)).unwrap(), SqlValue::Int(3));
        assert_eq!(json_to_sql(&json!(1.5)).unwrap(), SqlValue::Float(1.5));
        assert_eq!(json_to_sql(&json!("a")).unwrap(), SqlValue::Text("a".into()));
        assert_eq!(json_to_sql(&json!(null)).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_json_containers_rejected() {
        assert!(matches!(
            json_to_sql(&json!([1, 2])),
            Err(TypeError::UnsupportedJson(_))
        ));
        assert!(json_to_sql(&json!({"a": 1})).is_err());
    }
}
