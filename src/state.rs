use std::sync::Arc;

use crate::auth::{StoreTokenValidator, TokenValidator};
use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::handlers::ResourceRegistry;

/// Shared application state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub validator: Arc<dyn TokenValidator>,
    pub config: Arc<AppConfig>,
    pub resources: Arc<ResourceRegistry>,
}

impl AppState {
    /// State validating tokens against `store`.
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        Self {
            validator: Arc::new(StoreTokenValidator::new(store.clone())),
            store,
            config: Arc::new(config),
            resources: Arc::new(ResourceRegistry::standard()),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.validator = validator;
        self
    }
}
