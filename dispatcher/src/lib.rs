//! Dispatcher - request routing and argument binding for Weblog
//!
//! Handlers declare their parameters once at registration; each request is
//! routed, its arguments are bound from path, query and body, and the
//! handler's reply is formatted into a response.

pub mod binder;
pub mod core;
pub mod errors;
pub mod handler;
pub mod reply;
pub mod request;
pub mod router;
pub mod signature;

// Re-export the main public types for convenience
pub use binder::{CallArgs, REQUEST_KEY, bind};
pub use self::core::{Authenticator, Dispatcher};
pub use errors::{ApiError, BindError, HandlerError, RegistrationError, RenderError};
pub use handler::Handler;
pub use reply::{Content, Cookie, Reply, Response, TemplateRenderer, format_reply};
pub use request::{Method, Request, SessionUser};
pub use router::{PathPattern, RouteEntry, RouteMatch, Router};
pub use signature::{HandlerDescriptor, Param, Signature};
