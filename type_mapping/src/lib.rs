//! Unified type mapping between Rust values and SQL columns
//! This crate provides consistent value conversion used across the weblog ecosystem

pub mod errors;
pub mod serialize;
pub mod sql;
pub mod types;
pub mod validate;

pub use errors::TypeError;
pub use serialize::json_to_sql;
pub use sql::{default_ddl, quote_identifier};
pub use types::{SqlValue, StorageType};
pub use validate::FieldValue;
