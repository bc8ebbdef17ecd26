use std::future::Future;

use async_trait::async_trait;

use crate::binder::CallArgs;
use crate::errors::HandlerError;
use crate::reply::Reply;

/// Business logic bound to a route
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: CallArgs) -> Result<Reply, HandlerError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    async fn call(&self, args: CallArgs) -> Result<Reply, HandlerError> {
        (self)(args).await
    }
}
