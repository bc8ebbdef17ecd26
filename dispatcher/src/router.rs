//! Route table
//!
//! Patterns are literal segments plus `{name}` capture segments, e.g.
//! `/api/blogs/{id}/comments`. Matching is exact on method and segment count.
//! When two patterns for the same method have the same shape, the one
//! registered first wins and the later one is reported at registration.

use std::fmt;
use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::errors::RegistrationError;
use crate::handler::Handler;
use crate::request::Method;
use crate::signature::{HandlerDescriptor, Signature};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, RegistrationError> {
        if !pattern.starts_with('/') {
            return Err(RegistrationError::pattern(pattern, "must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        for segment in split_path(pattern) {
            let capture = segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'));
            match capture {
                Some(name) => {
                    let valid = !name.is_empty()
                        && !name.starts_with(|c: char| c.is_ascii_digit())
                        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                    if !valid {
                        return Err(RegistrationError::pattern(
                            pattern,
                            format!("invalid capture name '{}'", name),
                        ));
                    }
                    if names.contains(&name) {
                        return Err(RegistrationError::pattern(
                            pattern,
                            format!("duplicate capture name '{}'", name),
                        ));
                    }
                    names.push(name);
                    segments.push(Segment::Capture(name.to_string()));
                }
                None if segment.contains(['{', '}']) => {
                    return Err(RegistrationError::pattern(
                        pattern,
                        format!("capture must span a whole segment: '{}'", segment),
                    ));
                }
                None => segments.push(Segment::Literal(segment.to_string())),
            }
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Captures in pattern order when `path` matches.
    ///
    /// Captured values are percent-decoded; invalid UTF-8 is replaced.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut captures = Vec::new();
        let mut parts = split_path(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture(_) if part.is_empty() => return None,
                Segment::Capture(name) => captures.push((
                    name.clone(),
                    percent_decode_str(part).decode_utf8_lossy().into_owned(),
                )),
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Whether both patterns match exactly the same paths
    pub fn same_shape(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Capture(_), Segment::Capture(_)) => true,
                    _ => false,
                })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A registered route
pub struct RouteEntry {
    pub method: Method,
    pub pattern: PathPattern,
    pub name: String,
    pub descriptor: HandlerDescriptor,
    handler: Arc<dyn Handler>,
}

impl RouteEntry {
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Result of a successful lookup
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub captures: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `method` and `pattern`.
    ///
    /// The signature is validated here, once.
    pub fn register<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        name: &str,
        signature: Signature,
        handler: H,
    ) -> Result<(), RegistrationError> {
        let pattern = PathPattern::parse(pattern)?;
        let descriptor = HandlerDescriptor::from_signature(name, &signature)?;

        if let Some(existing) = self
            .routes
            .iter()
            .find(|route| route.method == method && route.pattern.same_shape(&pattern))
        {
            tracing::warn!(
                "route {} {} ({}) is shadowed by {} ({})",
                method,
                pattern,
                name,
                existing.pattern,
                existing.name
            );
        }

        tracing::info!("add route {} {} => {}({:?})", method, pattern, name, signature.params());
        self.routes.push(RouteEntry {
            method,
            pattern,
            name: name.to_string(),
            descriptor,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// First route registered for `method` whose pattern matches `path`
    pub fn dispatch(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|captures| RouteMatch {
                        entry: route,
                        captures,
                    })
            })
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::CallArgs;
    use crate::errors::HandlerError;
    use crate::reply::Reply;
    use pretty_assertions::assert_eq;

    async fn noop(_args: CallArgs) -> Result<Reply, HandlerError> {
        Ok(Reply::text("ok"))
    }

    fn pairs(captures: &[(String, String)]) -> Vec<(&str, &str)> {
        captures
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = PathPattern::parse("/api/blogs/{id}/comments").unwrap();
        let captures = pattern.matches("/api/blogs/42/comments").unwrap();
        assert_eq!(pairs(&captures), vec![("id", "42")]);

        assert!(pattern.matches("/api/blogs/42").is_none());
        assert!(pattern.matches("/api/blogs//comments").is_none());
        assert!(pattern.matches("/api/blogs/42/comments/x").is_none());

        let root = PathPattern::parse("/").unwrap();
        assert!(root.matches("/").is_some());
        assert!(root.matches("/x").is_none());
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let pattern = PathPattern::parse("/blog/{id}").unwrap();
        let captures = pattern.matches("/blog/a%20b").unwrap();
        assert_eq!(pairs(&captures), vec![("id", "a b")]);

        let captures = pattern.matches("/blog/caf%C3%A9%2F1").unwrap();
        assert_eq!(pairs(&captures), vec![("id", "café/1")]);

        // literals compare against the raw segment
        let literal = PathPattern::parse("/a b").unwrap();
        assert!(literal.matches("/a%20b").is_none());
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["api/blogs", "/api/{}", "/api/{1d}", "/a/{id}/{id}", "/a/x{id}"] {
            assert!(
                matches!(
                    PathPattern::parse(bad),
                    Err(RegistrationError::InvalidPattern { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_dispatch_by_method_and_path() {
        let mut router = Router::new();
        router
            .register(Method::Get, "/api/blogs", "list", Signature::new(), noop)
            .unwrap();
        router
            .register(
                Method::Get,
                "/api/blogs/{id}",
                "get",
                Signature::new().required("id"),
                noop,
            )
            .unwrap();
        router
            .register(
                Method::Post,
                "/api/blogs/{id}",
                "update",
                Signature::new().required("id"),
                noop,
            )
            .unwrap();

        let found = router.dispatch(Method::Get, "/api/blogs/7").unwrap();
        assert_eq!(found.entry.name, "get");
        assert_eq!(pairs(&found.captures), vec![("id", "7")]);

        let found = router.dispatch(Method::Post, "/api/blogs/7").unwrap();
        assert_eq!(found.entry.name, "update");

        assert!(router.dispatch(Method::Delete, "/api/blogs/7").is_none());
        assert!(router.dispatch(Method::Get, "/api/users").is_none());
    }

    #[test]
    fn test_first_registered_wins() {
        let mut router = Router::new();
        router
            .register(Method::Get, "/blog/{id}", "first", Signature::new(), noop)
            .unwrap();
        router
            .register(Method::Get, "/blog/{slug}", "second", Signature::new(), noop)
            .unwrap();
        assert_eq!(router.len(), 2);
        assert_eq!(router.dispatch(Method::Get, "/blog/a").unwrap().entry.name, "first");
    }

    #[test]
    fn test_literal_registered_first_beats_capture() {
        let mut router = Router::new();
        router
            .register(Method::Get, "/manage/blogs/create", "create", Signature::new(), noop)
            .unwrap();
        router
            .register(Method::Get, "/manage/blogs/{id}", "edit", Signature::new(), noop)
            .unwrap();
        assert_eq!(
            router.dispatch(Method::Get, "/manage/blogs/create").unwrap().entry.name,
            "create"
        );
        assert_eq!(
            router.dispatch(Method::Get, "/manage/blogs/9").unwrap().entry.name,
            "edit"
        );
    }

    #[test]
    fn test_invalid_signature_rejected_at_registration() {
        let mut router = Router::new();
        let err = router
            .register(
                Method::Get,
                "/x",
                "bad",
                Signature::new().request().positional("id"),
                noop,
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidHandlerSignature { .. }));
        assert!(router.is_empty());
    }
}
