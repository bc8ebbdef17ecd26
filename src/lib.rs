//! # Weblog
//!
//! The core of a small blog web application: declared models stored in
//! PostgreSQL, a pooled query executor, cookie sessions, and a dispatcher
//! that routes requests and binds handler arguments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weblog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     weblog::telemetry::init("info");
//!     let config = AppConfig::load()?;
//!
//!     let app = Weblog::new(&config).await?;
//!     app.migrate(false).await?;
//!
//!     let response = app.handle(Request::new(Method::Get, "/api/blogs?page=1")).await;
//!     println!("{} {}", response.status, response.body_text());
//!
//!     app.close().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod auth;
pub mod core;
pub mod errors;
pub mod filters;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod prelude;
pub mod telemetry;

// Re-export the main public types for convenience
pub use self::core::{Weblog, register_models};
pub use errors::WeblogError;
pub use models::{Blog, Comment, User};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, ServerConfig, SessionConfig};

// Re-export internal crates used by macros and public API
pub use dispatcher;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
