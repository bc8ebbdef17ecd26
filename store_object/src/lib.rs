//! Store Object - Core database abstraction layer for Weblog
//!
//! This crate provides schema compilation, pooled query execution, the record
//! runtime for declared models, listing queries and pagination.

pub mod errors;
pub mod executor;
pub mod generic_store;
pub mod model;
pub mod prelude;
pub mod query_builder;
pub mod schema;
pub mod validation;

pub use errors::{SchemaError, StoreError};
pub use executor::{QueryExecutor, Row};
pub use generic_store::ModelStore;
pub use model::Model;
pub use query_builder::{FindQuery, Limit, Page};
pub use schema::{DefaultValue, FieldDescriptor, ModelSchema};
pub use validation::ValidationError;

// Re-exported for the code generated by `model!`
pub use serde;
pub use type_mapping;
