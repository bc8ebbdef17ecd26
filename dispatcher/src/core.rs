use std::sync::Arc;

use async_trait::async_trait;

use crate::binder::bind;
use crate::errors::HandlerError;
use crate::reply::{Reply, Response, TemplateRenderer, format_reply};
use crate::request::Request;
use crate::router::Router;

/// Runs before routing; may attach a user to the request.
///
/// Returning a reply short-circuits dispatch, e.g. to redirect an
/// unauthorised visitor.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &mut Request) -> Option<Reply>;
}

/// Dispatch boundary: request in, response out, never an error
pub struct Dispatcher {
    router: Router,
    authenticator: Option<Arc<dyn Authenticator>>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            authenticator: None,
            renderer: None,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Get router reference
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Authenticate, route, bind, call and format
    pub async fn handle(&self, mut request: Request) -> Response {
        tracing::info!("Request: {} {}", request.method, request.path);

        if let Some(authenticator) = &self.authenticator {
            if let Some(reply) = authenticator.authenticate(&mut request).await {
                return self.format(reply, &request);
            }
        }

        let request = Arc::new(request);
        let reply = self.invoke(&request).await;
        self.format(reply, &request)
    }

    async fn invoke(&self, request: &Arc<Request>) -> Reply {
        let Some(route) = self.router.dispatch(request.method, &request.path) else {
            return Reply::status_with(404, "Not Found");
        };

        let args = match bind(&route.entry.descriptor, request, &route.captures) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!("{} {}: {}", request.method, request.path, e);
                return Reply::status_with(400, e.to_string());
            }
        };

        match route.entry.handler().call(args).await {
            Ok(reply) => reply,
            Err(HandlerError::Api(e)) => {
                tracing::info!("{} failed: {}", route.entry.name, e);
                Reply::json(e.to_payload())
            }
            Err(e) => {
                tracing::error!("{} failed: {}", route.entry.name, e);
                Reply::status_with(500, "Internal Server Error")
            }
        }
    }

    fn format(&self, reply: Reply, request: &Request) -> Response {
        let response = format_reply(reply, request.user.as_ref(), self.renderer.as_deref());
        tracing::info!("Response: {} {} -> {}", request.method, request.path, response.status);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::CallArgs;
    use crate::errors::ApiError;
    use crate::request::{Method, SessionUser};
    use crate::signature::Signature;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    async fn get_blog(args: CallArgs) -> Result<Reply, HandlerError> {
        let id = args.require_str("id")?;
        if id == "missing" {
            return Err(ApiError::not_found("Blog", "no such blog").into());
        }
        Ok(Reply::json(json!({ "id": id })))
    }

    async fn authenticate(args: CallArgs) -> Result<Reply, HandlerError> {
        let email = args.require_str("email")?;
        Ok(Reply::json(json!({ "email": email })))
    }

    async fn explode(_args: CallArgs) -> Result<Reply, HandlerError> {
        Err(HandlerError::Internal("boom".to_string()))
    }

    async fn whoami(args: CallArgs) -> Result<Reply, HandlerError> {
        let name = args.user().map(|user| user.name.clone());
        Ok(Reply::json(json!({ "user": name })))
    }

    struct FixedUser;

    #[async_trait]
    impl Authenticator for FixedUser {
        async fn authenticate(&self, request: &mut Request) -> Option<Reply> {
            if request.path.starts_with("/manage/") {
                return Some(Reply::redirect("/signin"));
            }
            request.user = Some(SessionUser {
                id: "u1".into(),
                email: "ann@example.com".into(),
                name: "Ann".into(),
                image: String::new(),
                admin: false,
            });
            None
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut router = Router::new();
        router
            .register(Method::Get, "/api/blogs/{id}", "get_blog", Signature::new().required("id"), get_blog)
            .unwrap();
        router
            .register(
                Method::Post,
                "/api/authenticate",
                "authenticate",
                Signature::new().required("email").required("passwd"),
                authenticate,
            )
            .unwrap();
        router
            .register(Method::Get, "/explode", "explode", Signature::new(), explode)
            .unwrap();
        router
            .register(Method::Get, "/whoami", "whoami", Signature::new().request(), whoami)
            .unwrap();
        Dispatcher::new(router)
    }

    fn json_body(response: &Response) -> Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_routes_and_binds() {
        let response = dispatcher()
            .handle(Request::new(Method::Get, "/api/blogs/7?id=8"))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(json_body(&response), json!({"id": "7"}));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = dispatcher().handle(Request::new(Method::Get, "/nope")).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_bind_failure_is_400() {
        let request = Request::new(Method::Post, "/api/authenticate")
            .with_body("application/json", r#"{"passwd": "x"}"#);
        let response = dispatcher().handle(request).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body_text(), "Missing argument: email");
    }

    #[tokio::test]
    async fn test_api_error_becomes_payload() {
        let response = dispatcher()
            .handle(Request::new(Method::Get, "/api/blogs/missing"))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(
            json_body(&response),
            json!({"error": "value: notfound", "data": "Blog", "message": "no such blog"})
        );
    }

    #[tokio::test]
    async fn test_unexpected_error_is_500() {
        let response = dispatcher().handle(Request::new(Method::Get, "/explode")).await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_authenticator_attaches_user_or_short_circuits() {
        let dispatcher = dispatcher().with_authenticator(Arc::new(FixedUser));

        let response = dispatcher.handle(Request::new(Method::Get, "/whoami")).await;
        assert_eq!(json_body(&response), json!({"user": "Ann"}));

        let response = dispatcher
            .handle(Request::new(Method::Get, "/manage/blogs"))
            .await;
        assert_eq!(response.status, 302);
        assert_eq!(response.header("Location"), Some("/signin"));
    }
}
