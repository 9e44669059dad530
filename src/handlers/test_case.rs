use async_trait::async_trait;
use axum::http::Method;
use bson::doc;
use serde_json::{Map, Value};

use crate::api::HandlerResponse;
use crate::error::ApiError;
use crate::models::keys::*;
use crate::models::{DocumentModel, TestCase};
use crate::validator::KeySchema;

use super::crud;
use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

const TEST_CASE_KEYS: &[&str] = &[
    NAME_KEY,
    TEST_GROUP_ID_KEY,
    STATUS_KEY,
    TIME_KEY,
    DEFINITION_URI_KEY,
    VCS_COMMIT_KEY,
    KVM_GUEST_KEY,
    INDEX_KEY,
    MEASUREMENTS_KEY,
    PARAMETERS_KEY,
];

/// /test/case - individual test results
#[derive(Debug, Default, Clone, Copy)]
pub struct TestCaseHandler;

#[async_trait]
impl ResourceHandler for TestCaseHandler {
    fn name(&self) -> &'static str {
        "test_case"
    }

    fn implements(&self, method: &Method) -> bool {
        matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE)
    }

    fn valid_keys(&self, method: &Method) -> Option<KeySchema> {
        match *method {
            Method::POST => Some(KeySchema::Structured {
                mandatory: &[NAME_KEY, TEST_GROUP_ID_KEY],
                accepted: TEST_CASE_KEYS,
            }),
            Method::PUT => Some(KeySchema::Accepted(TEST_CASE_KEYS)),
            _ => None,
        }
    }

    fn searchable_keys(&self) -> &'static [&'static str] {
        &[
            ID_KEY,
            NAME_KEY,
            TEST_GROUP_ID_KEY,
            STATUS_KEY,
            VCS_COMMIT_KEY,
            KVM_GUEST_KEY,
        ]
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        match id {
            Some(id) => crud::find_by_id(ctx, TEST_CASE_COLLECTION, id).await,
            None => crud::list(ctx, TEST_CASE_COLLECTION, query).await,
        }
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let test_case = TestCase::from_json(&body)?;
        let (_, response) =
            crud::create(ctx, TEST_CASE_COLLECTION, test_case.to_document(), "/test/case").await?;
        Ok(response)
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let id = crud::require_id(id)?;
        let stored =
            crud::load(ctx, TEST_CASE_COLLECTION, doc! { ID_KEY: id }, &id.to_hex()).await?;

        let mut test_case = TestCase::from_document(&stored)?;
        test_case.apply_json(&body)?;

        crud::update(ctx, TEST_CASE_COLLECTION, id, test_case.to_document()).await
    }

    async fn delete(&self, ctx: &RequestContext, id: Option<&str>) -> Result<HandlerResponse, ApiError> {
        crud::delete_by_id(ctx, TEST_CASE_COLLECTION, id).await
    }
}
