//! Handler replies and their wire form
//!
//! Handlers return a [`Reply`]; [`format_reply`] turns it into a
//! [`Response`]. Template rendering is delegated to a [`TemplateRenderer`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{HandlerError, RenderError};
use crate::request::SessionUser;

/// Context key the signed-in user is rendered under
pub const USER_KEY: &str = "__user__";

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Json(Value),
    Template { name: String, context: Map<String, Value> },
    Html(String),
    Text(String),
    Redirect(String),
    Bytes(Vec<u8>),
    Status { code: u16, message: Option<String> },
}

/// Cookie to set on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age: i64,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: &str, value: &str, max_age: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            max_age,
            http_only: true,
        }
    }

    /// Cookie that clears `name` on the client
    pub fn expired(name: &str) -> Self {
        Self::new(name, "-deleted-", 0)
    }

    pub fn to_header(&self) -> String {
        let mut header = format!(
            "{}={}; Max-Age={}; Path=/",
            self.name, self.value, self.max_age
        );
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}

/// What a handler produced
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: Content,
    pub cookies: Vec<Cookie>,
}

impl Reply {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            cookies: Vec::new(),
        }
    }

    pub fn json(value: Value) -> Self {
        Self::new(Content::Json(value))
    }

    /// JSON reply from any serializable value
    pub fn to_json<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(Self::json(serde_json::to_value(value)?))
    }

    /// Render `name` with `context`; a non-object context is rendered as `{}`
    pub fn template(name: &str, context: Value) -> Self {
        let context = match context {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(Content::Template {
            name: name.to_string(),
            context,
        })
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(Content::Html(body.into()))
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Content::Text(body.into()))
    }

    pub fn redirect(location: &str) -> Self {
        Self::new(Content::Redirect(location.to_string()))
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self::new(Content::Bytes(body))
    }

    pub fn status(code: u16) -> Self {
        Self::new(Content::Status {
            code,
            message: None,
        })
    }

    pub fn status_with(code: u16, message: impl Into<String>) -> Self {
        Self::new(Content::Status {
            code,
            message: Some(message.into()),
        })
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::json(value)
    }
}

/// Wire-level response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Renders named templates; lookup and substitution live outside the core
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Turn `reply` into a response.
///
/// Templates get the signed-in user (or null) under `__user__`. A template
/// reply with no renderer, or a failed render, is a 500.
pub fn format_reply(
    reply: Reply,
    user: Option<&SessionUser>,
    renderer: Option<&dyn TemplateRenderer>,
) -> Response {
    let mut response = match reply.content {
        Content::Json(value) => match serde_json::to_vec(&value) {
            Ok(body) => Response::new(200, Some("application/json;charset=utf-8"), body),
            Err(e) => {
                tracing::error!("failed to encode JSON reply: {}", e);
                Response::new(500, Some("text/plain;charset=utf-8"), "Internal Server Error")
            }
        },
        Content::Template { name, mut context } => {
            let user = user
                .and_then(|user| serde_json::to_value(user).ok())
                .unwrap_or(Value::Null);
            context.insert(USER_KEY.to_string(), user);
            match renderer.map(|renderer| renderer.render(&name, &context)) {
                Some(Ok(html)) => Response::new(200, Some("text/html;charset=utf-8"), html),
                Some(Err(e)) => {
                    tracing::error!("{}", e);
                    Response::new(500, Some("text/plain;charset=utf-8"), "Internal Server Error")
                }
                None => {
                    tracing::error!("no template renderer configured for {}", name);
                    Response::new(500, Some("text/plain;charset=utf-8"), "Internal Server Error")
                }
            }
        }
        Content::Html(html) => Response::new(200, Some("text/html;charset=utf-8"), html),
        Content::Text(text) => Response::new(200, Some("text/plain;charset=utf-8"), text),
        Content::Redirect(location) => {
            let mut response = Response::new(302, None, Vec::new());
            response.headers.push(("Location".to_string(), location));
            response
        }
        Content::Bytes(body) => Response::new(200, Some("application/octet-stream"), body),
        Content::Status { code, message } => match message {
            Some(message) => Response::new(code, Some("text/plain;charset=utf-8"), message),
            None => Response::new(code, None, Vec::new()),
        },
    };

    for cookie in reply.cookies {
        response
            .headers
            .push(("Set-Cookie".to_string(), cookie.to_header()));
    }
    response
}
