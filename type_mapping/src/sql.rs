//! SQL type conversion utilities
//!
//! This module handles conversion between field storage kinds and their SQL
//! equivalents.

use crate::types::StorageType;

/// Default column type used in DDL generation for a storage kind
pub fn default_ddl(storage: StorageType) -> &'static str {
    match storage {
        StorageType::String => "varchar(100)",
        StorageType::Boolean => "boolean",
        StorageType::Integer => "bigint",
        StorageType::Float => "double precision",
        StorageType::Text => "text",
    }
}

/// Quote an identifier for PostgreSQL, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
