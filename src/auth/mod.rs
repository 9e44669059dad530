use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use bson::{doc, oid::ObjectId};
use chrono::Utc;
use tracing::{debug, warn};

use crate::database::{DatabaseError, DocumentStore};
use crate::models::keys::{TOKEN_COLLECTION, TOKEN_KEY};
use crate::models::{DocumentModel, Token, TokenProperties};

/// Who is behind an authenticated request.
#[derive(Clone, Debug, PartialEq)]
pub enum Identity {
    MasterKey,
    Token {
        id: Option<ObjectId>,
        email: Option<String>,
    },
}

/// Authenticated caller context, attached to the request once the token checks out.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: Identity,
    pub properties: TokenProperties,
}

impl AuthUser {
    pub fn master() -> Self {
        Self {
            identity: Identity::MasterKey,
            properties: TokenProperties::all(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.properties.admin
    }

    pub fn permits(&self, method: &Method) -> bool {
        self.properties.permits(method)
    }
}

impl From<Token> for AuthUser {
    fn from(token: Token) -> Self {
        Self {
            identity: Identity::Token {
                id: token.meta.id,
                email: token.email,
            },
            properties: token.properties,
        }
    }
}

/// Decides whether a bearer token may perform a request.
///
/// `Ok(None)` is a rejection; errors are reserved for datastore failures.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(
        &self,
        token: &str,
        method: &Method,
        remote: Option<IpAddr>,
    ) -> Result<Option<AuthUser>, DatabaseError>;
}

/// Validates tokens against the token collection of the datastore.
pub struct StoreTokenValidator {
    store: Arc<dyn DocumentStore>,
}

impl StoreTokenValidator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TokenValidator for StoreTokenValidator {
    async fn validate(
        &self,
        token: &str,
        method: &Method,
        remote: Option<IpAddr>,
    ) -> Result<Option<AuthUser>, DatabaseError> {
        let Some(document) = self
            .store
            .find_one(TOKEN_COLLECTION, doc! { TOKEN_KEY: token })
            .await?
        else {
            debug!("Unknown token presented");
            return Ok(None);
        };

        let token = match Token::from_document(&document) {
            Ok(token) => token,
            Err(e) => {
                warn!("Stored token {:?} is malformed: {}", document.get(crate::models::keys::ID_KEY), e);
                return Ok(None);
            }
        };

        if token.is_expired(Utc::now()) {
            warn!("Expired token {:?} used", token.id());
            return Ok(None);
        }
        if !token.properties.permits(method) {
            warn!("Token {:?} lacks permission for {}", token.id(), method);
            return Ok(None);
        }
        if !token.allows_ip(remote) {
            warn!("Token {:?} used from unlisted address {:?}", token.id(), remote);
            return Ok(None);
        }

        Ok(Some(AuthUser::from(token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    async fn store_with(token: serde_json::Value) -> (Arc<dyn DocumentStore>, String) {
        let token = Token::from_json(token.as_object().unwrap()).unwrap();
        let value = token.token.clone();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store.insert(TOKEN_COLLECTION, token.to_document()).await.unwrap();
        (store, value)
    }

    #[tokio::test]
    async fn accepts_token_with_permission() {
        let (store, value) = store_with(json!({ "email": "a@b", "get": 1 })).await;
        let validator = StoreTokenValidator::new(store);

        let user = validator.validate(&value, &Method::GET, None).await.unwrap().unwrap();
        assert!(!user.is_admin());
        assert!(matches!(user.identity, Identity::Token { .. }));
    }

    #[tokio::test]
    async fn rejects_unknown_token_and_missing_permission() {
        let (store, value) = store_with(json!({ "email": "a@b", "get": 1 })).await;
        let validator = StoreTokenValidator::new(store);

        assert!(validator.validate("nope", &Method::GET, None).await.unwrap().is_none());
        assert!(validator.validate(&value, &Method::DELETE, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let (store, value) =
            store_with(json!({ "email": "a@b", "admin": 1, "expires_on": "2014-07-01" })).await;
        let validator = StoreTokenValidator::new(store);

        assert!(validator.validate(&value, &Method::GET, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enforces_ip_restriction() {
        let (store, value) = store_with(json!({
            "email": "a@b",
            "admin": 1,
            "ip_restricted": 1,
            "ip_address": ["192.168.1.10"],
        }))
        .await;
        let validator = StoreTokenValidator::new(store);

        let allowed = Some("192.168.1.10".parse().unwrap());
        let other = Some("192.168.1.11".parse().unwrap());
        assert!(validator.validate(&value, &Method::GET, allowed).await.unwrap().is_some());
        assert!(validator.validate(&value, &Method::GET, other).await.unwrap().is_none());
        assert!(validator.validate(&value, &Method::GET, None).await.unwrap().is_none());
    }
}
