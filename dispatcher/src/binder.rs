//! Parameter binding
//!
//! Turns a matched request into the keyword arguments of its handler. Body
//! methods read JSON, form or multipart bodies; the other methods read the
//! query string. Path captures are merged last and win over both.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use type_mapping::{SqlValue, json_to_sql};

use crate::errors::{ApiError, BindError};
use crate::request::{Request, SessionUser};
use crate::signature::HandlerDescriptor;

/// Key under which the request object is passed
pub const REQUEST_KEY: &str = "request";

/// Bound handler arguments
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Map<String, Value>,
    request: Option<Arc<Request>>,
}

impl CallArgs {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            request: None,
        }
    }

    pub fn with_request(mut self, request: Arc<Request>) -> Self {
        self.request = Some(request);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        (name == REQUEST_KEY && self.request.is_some()) || self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String argument; numbers and booleans are not coerced
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// String argument, or `ApiError::value_invalid` naming it when absent
    pub fn require_str(&self, name: &str) -> Result<&str, ApiError> {
        self.str(name)
            .ok_or_else(|| ApiError::value_invalid(name, &format!("{} is required", name)))
    }

    /// Deserialize an argument into `T`
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ApiError::value_invalid(name, &e.to_string())),
        }
    }

    /// Argument as a statement parameter; absent is NULL
    pub fn sql(&self, name: &str) -> Result<SqlValue, ApiError> {
        match self.values.get(name) {
            None => Ok(SqlValue::Null),
            Some(value) => {
                json_to_sql(value).map_err(|e| ApiError::value_invalid(name, &e.to_string()))
            }
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.request().and_then(|request| request.user.as_ref())
    }
}

/// Bind `request` for the handler described by `descriptor`
pub fn bind(
    descriptor: &HandlerDescriptor,
    request: &Arc<Request>,
    captures: &[(String, String)],
) -> Result<CallArgs, BindError> {
    let parsed = if !descriptor.wants_keywords() {
        None
    } else if request.method.carries_body() {
        Some(parse_body(request)?)
    } else if request.query_string.is_empty() {
        None
    } else {
        Some(parse_pairs(request.query_string.as_bytes()))
    };

    let mut values = match parsed {
        Some(parsed) if !descriptor.accepts_arbitrary_keywords() => {
            let mut kept = Map::new();
            for name in descriptor.named() {
                if let Some(value) = parsed.get(name) {
                    kept.insert(name.clone(), value.clone());
                }
            }
            kept
        }
        Some(parsed) => parsed,
        None => Map::new(),
    };

    for (name, value) in captures {
        if values.contains_key(name) {
            tracing::warn!(
                "Duplicate arg name in named arg and kw args: {}",
                name
            );
        }
        values.insert(name.clone(), Value::String(value.clone()));
    }

    let mut args = CallArgs::new(values);
    if descriptor.accepts_request() {
        args = args.with_request(Arc::clone(request));
    }

    for name in descriptor.required() {
        if !args.contains(name) {
            return Err(BindError::MissingArgument(name.clone()));
        }
    }

    tracing::debug!("call with args: {:?}", args.values);
    Ok(args)
}

fn parse_body(request: &Request) -> Result<Map<String, Value>, BindError> {
    let content_type = request
        .content_type()
        .ok_or(BindError::MissingContentType)?;

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(&request.body)
            .map_err(|e| BindError::MalformedJson(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(BindError::JsonNotObject),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Ok(parse_pairs(&request.body))
    } else if content_type.starts_with("multipart/form-data") {
        let boundary = request
            .content_type_param("boundary")
            .ok_or_else(|| BindError::MalformedMultipart("missing boundary".to_string()))?;
        parse_multipart(&request.body, &boundary)
    } else {
        Err(BindError::UnsupportedContentType(
            request.header("content-type").unwrap_or_default().to_string(),
        ))
    }
}

/// Urlencoded pairs into a flat mapping; the first value of a key wins
fn parse_pairs(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        if !map.contains_key(key.as_ref()) {
            map.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }
    map
}

fn parse_multipart(body: &[u8], boundary: &str) -> Result<Map<String, Value>, BindError> {
    let text = String::from_utf8_lossy(body);
    let delimiter = format!("--{}", boundary);
    let mut map = Map::new();

    let mut parts = text.split(delimiter.as_str());
    parts.next(); // preamble
    for part in parts {
        if part.starts_with("--") {
            break;
        }
        let part = part.strip_prefix("\r\n").unwrap_or(part);
        let (head, content) = part
            .split_once("\r\n\r\n")
            .ok_or_else(|| BindError::MalformedMultipart("part without header block".to_string()))?;
        let content = content.strip_suffix("\r\n").unwrap_or(content);

        let name = head
            .split("\r\n")
            .filter(|line| {
                line.split(':')
                    .next()
                    .is_some_and(|header| header.trim().eq_ignore_ascii_case("content-disposition"))
            })
            .find_map(disposition_name)
            .ok_or_else(|| BindError::MalformedMultipart("part without a name".to_string()))?;

        if !map.contains_key(&name) {
            map.insert(name, Value::String(content.to_string()));
        }
    }
    Ok(map)
}

fn disposition_name(line: &str) -> Option<String> {
    line.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim() == "name" {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
