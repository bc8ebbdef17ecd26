//! Convenience re-exports for common Weblog usage
//!
//! ```rust
//! use weblog::prelude::*;
//! ```

// Core Weblog components
pub use crate::core::Weblog;
pub use crate::errors::WeblogError;
pub use crate::migration::auto_migrate;
pub use crate::models::{Blog, Comment, User};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, ServerConfig, SessionConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Request handling
pub use dispatcher::{
    ApiError, CallArgs, Dispatcher, HandlerError, Method, Reply, Request, Response, Router,
    Signature, TemplateRenderer,
};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
