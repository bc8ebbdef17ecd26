use serde::Serialize;
use store_object::StoreError;
use thiserror::Error;

/// Problems found while registering a route
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid handler signature for {handler}: {reason}")]
    InvalidHandlerSignature { handler: String, reason: String },

    #[error("Invalid path pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RegistrationError {
    pub(crate) fn signature(handler: &str, reason: impl Into<String>) -> Self {
        Self::InvalidHandlerSignature {
            handler: handler.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Request data that can't be turned into handler arguments.
///
/// Always a client error; the dispatcher answers 400 with the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("Missing Content-Type.")]
    MissingContentType,

    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("JSON body must be object.")]
    JsonNotObject,

    #[error("Malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),
}

/// Business error raised by handler logic.
///
/// Serialised as the `{error, data, message}` payload returned to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{error} ({data}): {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: &str, data: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            data: data.to_string(),
            message: message.to_string(),
        }
    }

    /// Input value is invalid; `field` names the offending input
    pub fn value_invalid(field: &str, message: &str) -> Self {
        Self::new("value: invalid", field, message)
    }

    /// Resource not found; `resource` names what was looked up
    pub fn not_found(resource: &str, message: &str) -> Self {
        Self::new("value: notfound", resource, message)
    }

    /// Caller may not do this; the reason travels in `data`
    pub fn permission(message: &str) -> Self {
        Self::new("permission: forbidden", message, "")
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error,
            "data": self.data,
            "message": self.message,
        })
    }
}

/// Everything a handler may fail with
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Template rendering failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Template error in {template}: {message}")]
pub struct RenderError {
    pub template: String,
    pub message: String,
}
