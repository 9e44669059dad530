use async_trait::async_trait;
use axum::http::Method;
use bson::doc;
use serde_json::{Map, Value};
use tracing::info;

use crate::api::HandlerResponse;
use crate::database::document_to_json;
use crate::error::ApiError;
use crate::models::keys::*;
use crate::models::{DocumentModel, Token};
use crate::validator::{parse_object_id, KeySchema};

use super::crud;
use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

const TOKEN_KEYS: &[&str] = &[
    EMAIL_KEY,
    USERNAME_KEY,
    EXPIRES_KEY,
    EXPIRED_KEY,
    IP_ADDRESS_KEY,
    ADMIN_KEY,
    SUPERUSER_KEY,
    GET_KEY,
    POST_KEY,
    PUT_KEY,
    DELETE_KEY,
    IP_RESTRICTED_KEY,
    LAB_KEY,
    TEST_LAB_KEY,
    UPLOAD_KEY,
];

/// /token - API token management, admin tokens and the master key only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenHandler;

#[async_trait]
impl ResourceHandler for TokenHandler {
    fn name(&self) -> &'static str {
        "token"
    }

    fn implements(&self, method: &Method) -> bool {
        matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE)
    }

    fn requires_admin(&self, _method: &Method) -> bool {
        true
    }

    fn valid_keys(&self, method: &Method) -> Option<KeySchema> {
        match *method {
            Method::POST => Some(KeySchema::Structured {
                mandatory: &[EMAIL_KEY],
                accepted: TOKEN_KEYS,
            }),
            Method::PUT => Some(KeySchema::Accepted(TOKEN_KEYS)),
            _ => None,
        }
    }

    fn searchable_keys(&self) -> &'static [&'static str] {
        &[ID_KEY, TOKEN_KEY, EMAIL_KEY, USERNAME_KEY, EXPIRED_KEY]
    }

    /// A single token is looked up by document id, or by its value when the
    /// id is not an ObjectId.
    async fn get(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        let Some(id) = id else {
            return crud::list(ctx, TOKEN_COLLECTION, query).await;
        };
        let filter = match parse_object_id(id) {
            Some(object_id) => doc! { ID_KEY: object_id },
            None => doc! { TOKEN_KEY: id },
        };
        let document = crud::load(ctx, TOKEN_COLLECTION, filter, id).await?;
        Ok(crud::one(document))
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let token = Token::from_json(&body)?;
        let (id, mut response) =
            crud::create(ctx, TOKEN_COLLECTION, token.to_document(), "/token").await?;
        info!("New token issued for {:?}", token.email);

        response.set_result(document_to_json(doc! {
            ID_KEY: id,
            TOKEN_KEY: token.token.as_str(),
        }));
        Ok(response)
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let id = crud::require_id(id)?;
        let stored = crud::load(ctx, TOKEN_COLLECTION, doc! { ID_KEY: id }, &id.to_hex()).await?;

        let mut token = Token::from_document(&stored)?;
        token.apply_json(&body)?;

        crud::update(ctx, TOKEN_COLLECTION, id, token.to_document()).await
    }

    async fn delete(&self, ctx: &RequestContext, id: Option<&str>) -> Result<HandlerResponse, ApiError> {
        crud::delete_by_id(ctx, TOKEN_COLLECTION, id).await
    }
}
