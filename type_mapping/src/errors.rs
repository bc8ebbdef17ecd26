//! Error types for value conversion

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Expected {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unsupported JSON value for SQL parameter: {0}")]
    UnsupportedJson(String),
}
