//! Error types for the Weblog crate
//!
//! This module contains all error types that can be returned while starting
//! or migrating the application.

use config::ConfigError;
use dispatcher::RegistrationError;
use store_object::{SchemaError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeblogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model declaration error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Route registration error: {0}")]
    Registration(#[from] RegistrationError),
}
