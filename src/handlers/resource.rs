use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::{Map, Value};

use crate::api::HandlerResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validator::KeySchema;

use super::batch::BatchHandler;
use super::lab::LabHandler;
use super::query::ListQuery;
use super::stats::StatisticsHandler;
use super::test_case::TestCaseHandler;
use super::token::TokenHandler;
use super::version::VersionHandler;

/// What a resource operation runs with.
pub struct RequestContext {
    pub state: AppState,
    pub user: Option<AuthUser>,
}

/// One REST resource. Verbs a resource does not override answer 501.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Name used in logs and batch operations.
    fn name(&self) -> &'static str;

    /// Verbs the resource serves; anything else answers 501 once the caller
    /// is authorized.
    fn implements(&self, method: &Method) -> bool;

    fn requires_auth(&self, _method: &Method) -> bool {
        true
    }

    /// Token permission checked for a request using `method`.
    fn permission_for(&self, method: &Method) -> Method {
        method.clone()
    }

    fn requires_admin(&self, _method: &Method) -> bool {
        false
    }

    /// Keys a POST or PUT body may carry. `None` skips key validation.
    fn valid_keys(&self, _method: &Method) -> Option<KeySchema> {
        None
    }

    /// Query keys usable as list filters.
    fn searchable_keys(&self) -> &'static [&'static str] {
        &[]
    }

    async fn get(
        &self,
        _ctx: &RequestContext,
        _id: Option<&str>,
        _query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        Err(not_implemented())
    }

    async fn post(
        &self,
        _ctx: &RequestContext,
        _body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        Err(not_implemented())
    }

    async fn put(
        &self,
        _ctx: &RequestContext,
        _id: Option<&str>,
        _body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        Err(not_implemented())
    }

    async fn delete(&self, _ctx: &RequestContext, _id: Option<&str>) -> Result<HandlerResponse, ApiError> {
        Err(not_implemented())
    }
}

pub fn not_implemented() -> ApiError {
    ApiError::not_implemented("Method not implemented")
}

/// Resources reachable by name, built once at startup.
pub struct ResourceRegistry {
    handlers: HashMap<&'static str, Arc<dyn ResourceHandler>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every resource the API serves, batch included.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TokenHandler));
        registry.register(Arc::new(TestCaseHandler));
        registry.register(Arc::new(LabHandler));
        registry.register(Arc::new(StatisticsHandler));
        registry.register(Arc::new(VersionHandler));
        registry.register(Arc::new(BatchHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(name).cloned()
    }
}
