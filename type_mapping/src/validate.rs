//! Typed field conversion
//!
//! Model structs hold plain Rust values; this module checks that a
//! `SqlValue` read from a row or handed to a setter fits the field type.

use crate::errors::TypeError;
use crate::types::{SqlValue, StorageType};

/// A Rust type that can back a model field
pub trait FieldValue: Sized + Clone + Default {
    /// Storage kind of the values this type holds; a model field's declared
    /// kind must accept it
    const STORAGE: StorageType;

    fn into_sql(self) -> SqlValue;

    fn from_sql(value: SqlValue) -> Result<Self, TypeError>;
}

fn mismatch(expected: &'static str, found: &SqlValue) -> TypeError {
    TypeError::Mismatch {
        expected,
        found: found.kind(),
    }
}

impl FieldValue for String {
    const STORAGE: StorageType = StorageType::String;

    fn into_sql(self) -> SqlValue {
        SqlValue::Text(self)
    }

    fn from_sql(value: SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FieldValue for bool {
    const STORAGE: StorageType = StorageType::Boolean;

    fn into_sql(self) -> SqlValue {
        SqlValue::Bool(self)
    }

    fn from_sql(value: SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            // tinyint-style flags
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FieldValue for i64 {
    const STORAGE: StorageType = StorageType::Integer;

    fn into_sql(self) -> SqlValue {
        SqlValue::Int(self)
    }

    fn from_sql(value: SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int(i) => Ok(i),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FieldValue for f64 {
    const STORAGE: StorageType = StorageType::Float;

    fn into_sql(self) -> SqlValue {
        SqlValue::Float(self)
    }

    fn from_sql(value: SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening_conversions() {
        assert_eq!(f64::from_sql(SqlValue::Int(3)).unwrap(), 3.0);
        assert!(bool::from_sql(SqlValue::Int(1)).unwrap());
        assert!(!bool::from_sql(SqlValue::Int(0)).unwrap());
    }

    #[test]
    fn test_mismatch_reports_kinds() {
        let err = i64::from_sql(SqlValue::Text("12".into())).unwrap_err();
        assert_eq!(
            err,
            TypeError::Mismatch {
                expected: "integer",
                found: "text"
            }
        );
        assert!(bool::from_sql(SqlValue::Int(2)).is_err());
    }
}
