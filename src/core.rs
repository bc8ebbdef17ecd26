//! Core Weblog functionality
//!
//! This module contains the main Weblog struct, which wires the connection
//! pool, the model schemas, the route table and the dispatcher together.

use std::sync::Arc;

use config::{AppConfig, SessionConfig};
use dispatcher::{Dispatcher, Request, Response, TemplateRenderer};
use store_object::{Model, QueryExecutor, SchemaError};

use crate::auth::SessionAuthenticator;
use crate::errors::WeblogError;
use crate::filters::AgeAnnotator;
use crate::handlers::{AppState, routes};
use crate::migration::auto_migrate;
use crate::models::{Blog, Comment, User};

/// Compile every model schema; a declaration error is fatal at startup
pub fn register_models() -> Result<(), SchemaError> {
    User::register()?;
    Blog::register()?;
    Comment::register()?;
    Ok(())
}

/// Main Weblog coordinator
pub struct Weblog {
    executor: QueryExecutor,
    state: Arc<AppState>,
    dispatcher: Dispatcher,
}

impl Weblog {
    /// Create the connection pool and the application on top of it
    pub async fn new(config: &AppConfig) -> Result<Self, WeblogError> {
        let executor = QueryExecutor::connect(&config.database).await?;
        Self::with_executor(executor, config.session.clone())
    }

    /// Build the application on an existing executor
    pub fn with_executor(
        executor: QueryExecutor,
        session: SessionConfig,
    ) -> Result<Self, WeblogError> {
        register_models()?;

        let state = Arc::new(AppState::new(executor.clone(), session.clone()));
        let router = routes(Arc::clone(&state))?;
        tracing::info!("registered {} routes", router.len());

        let authenticator = SessionAuthenticator::new(state.users.clone(), session);
        let dispatcher = Dispatcher::new(router).with_authenticator(Arc::new(authenticator));

        Ok(Self {
            executor,
            state,
            dispatcher,
        })
    }

    /// Render templates with `renderer`; contexts gain `created_ago` strings
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        let renderer = Arc::new(AgeAnnotator::new(renderer));
        self.dispatcher = self.dispatcher.with_renderer(renderer);
        self
    }

    /// Get the query executor
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Create the tables of every model
    pub async fn migrate(&self, recreate: bool) -> Result<(), WeblogError> {
        auto_migrate::<User>(&self.executor, recreate).await?;
        auto_migrate::<Blog>(&self.executor, recreate).await?;
        auto_migrate::<Comment>(&self.executor, recreate).await?;
        Ok(())
    }

    pub async fn handle(&self, request: Request) -> Response {
        self.dispatcher.handle(request).await
    }

    pub async fn close(&self) {
        self.executor.close().await;
    }
}
