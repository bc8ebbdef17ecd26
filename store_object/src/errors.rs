//! Error types for the object store
//!
//! Schema errors are configuration mistakes detected once at registration
//! time. Store errors surface per operation.

use thiserror::Error;
use type_mapping::{StorageType, TypeError};

/// Model declaration failures, fatal at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate primary key for field: {0}")]
    DuplicatePrimaryKey(String),

    #[error("Primary key not found for table: {0}")]
    MissingPrimaryKey(String),

    #[error("Duplicate field declared: {0}")]
    DuplicateField(String),

    #[error("Field '{field}' is declared {declared:?} but its Rust type holds {held:?}")]
    KindMismatch {
        field: String,
        declared: StorageType,
        held: StorageType,
    },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] crate::validation::ValidationError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Statement expects {expected} parameters but {given} were supplied")]
    ParameterCountMismatch { expected: usize, given: usize },

    #[error("Invalid limit value: {0}")]
    InvalidLimit(String),

    #[error("Unknown field '{field}' on table {table}")]
    UnknownField { table: String, field: String },

    #[error("Invalid value for field '{field}': {source}")]
    FieldType {
        field: String,
        #[source]
        source: TypeError,
    },

    #[error("Unsupported column type '{type_name}' for column '{column}'")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub fn field_type(field: &str, source: TypeError) -> Self {
        StoreError::FieldType {
            field: field.to_string(),
            source,
        }
    }
}
