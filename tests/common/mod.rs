#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bson::{oid::ObjectId, Document};
use serde_json::Value;
use tower::ServiceExt;

use kernelci_api::auth::{AuthUser, Identity, TokenValidator};
use kernelci_api::config::AppConfig;
use kernelci_api::database::{DatabaseError, DocumentStore, MemoryStore, Page};
use kernelci_api::models::TokenProperties;
use kernelci_api::{app, AppState};

/// Admin token accepted by [`StubValidator`].
pub const ADMIN_TOKEN: &str = "foo";
/// Token accepted for GET only.
pub const READ_TOKEN: &str = "reader";
pub const MASTER_KEY: &str = "bar";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Token validator with a fixed set of tokens, no datastore involved.
pub struct StubValidator;

#[async_trait]
impl TokenValidator for StubValidator {
    async fn validate(
        &self,
        token: &str,
        method: &Method,
        _remote: Option<IpAddr>,
    ) -> Result<Option<AuthUser>, DatabaseError> {
        let properties = match token {
            ADMIN_TOKEN => TokenProperties {
                admin: true,
                ..TokenProperties::default()
            },
            READ_TOKEN => TokenProperties {
                get: true,
                ..TokenProperties::default()
            },
            _ => return Ok(None),
        };
        if !properties.permits(method) {
            return Ok(None);
        }
        Ok(Some(AuthUser {
            identity: Identity::Token {
                id: None,
                email: Some(format!("{}@example.com", token)),
            },
            properties,
        }))
    }
}

/// Store whose writes and pings fail, reads go to an inner memory store.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(&self, collection: &str, filter: Document, page: Page) -> Result<Vec<Document>, DatabaseError> {
        self.inner.find(collection, filter, page).await
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError> {
        self.inner.count(collection, filter).await
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, DatabaseError> {
        self.inner.find_one(collection, filter).await
    }

    async fn insert(&self, _collection: &str, _document: Document) -> Result<ObjectId, DatabaseError> {
        Err(DatabaseError::QueryError("insert refused".into()))
    }

    async fn update(&self, _collection: &str, _filter: Document, _set: Document) -> Result<u64, DatabaseError> {
        Err(DatabaseError::QueryError("update refused".into()))
    }

    async fn delete(&self, _collection: &str, _filter: Document) -> Result<u64, DatabaseError> {
        Err(DatabaseError::QueryError("delete refused".into()))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::ConnectionError("connection refused".into()))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.master_key = Some(MASTER_KEY.to_string());
    config.api.enable_request_logging = false;
    config
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Object id of the first result, as written by relaxed extended JSON.
    pub fn first_id(&self) -> String {
        self.body["result"][0]["_id"]["$oid"]
            .as_str()
            .expect("result carries an _id")
            .to_string()
    }
}

/// Router driven in-process through `oneshot`.
pub struct TestApp {
    pub store: Arc<dyn DocumentStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::build(store, test_config())
    }

    /// Router over an empty store with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self::build(Arc::new(MemoryStore::new()), config)
    }

    fn build(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        let state = AppState::new(store.clone(), config).with_validator(Arc::new(StubValidator));
        Self {
            store,
            router: app(state),
        }
    }

    /// Router using the datastore backed token validator.
    pub fn with_stored_tokens() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), test_config());
        Self {
            store,
            router: app(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, headers, body }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, token, None, "").await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call(Method::DELETE, uri, token, None, "").await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.call(Method::POST, uri, token, Some("application/json"), &body.to_string())
            .await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.call(Method::PUT, uri, token, Some("application/json"), &body.to_string())
            .await
    }
}

pub struct LiveServer {
    pub base_url: String,
}

/// Serve the app on a free port with the datastore backed token validator.
pub async fn spawn_server() -> Result<LiveServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;

    let state = AppState::new(Arc::new(MemoryStore::new()), test_config());
    let service = app(state).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, service).await;
    });

    Ok(LiveServer {
        base_url: format!("http://127.0.0.1:{}", port),
    })
}
