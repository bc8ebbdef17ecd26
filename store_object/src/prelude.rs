//! Convenience re-exports for common store-object usage

// Record runtime
pub use crate::generic_store::ModelStore;
pub use crate::model::Model;

// Schema declaration
pub use crate::schema::{DefaultValue, FieldDescriptor, ModelSchema};

// Error types
pub use crate::errors::{SchemaError, StoreError};

// Execution
pub use crate::executor::{QueryExecutor, Row};

// Query building
pub use crate::query_builder::{FindQuery, Limit, Page};

// Values
pub use type_mapping::{FieldValue, SqlValue, StorageType};
