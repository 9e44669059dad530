use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::HandlerResponse;
use crate::error::ApiError;
use crate::models::keys::{
    BATCH_KEY, DOCUMENT_KEY, METHOD_KEY, OPERATION_ID_KEY, QUERY_KEY, RESOURCE_KEY,
};
use crate::validator::validate_batch;

use super::dispatch::check_access;
use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

const OPERATION_KEYS: &[&str] = &[
    METHOD_KEY,
    RESOURCE_KEY,
    DOCUMENT_KEY,
    QUERY_KEY,
    OPERATION_ID_KEY,
];

const RESULT_KEY: &str = "result";

/// /batch - run several read operations in one request
///
/// Each operation answers with its own envelope; a failing operation does
/// not fail the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchHandler;

impl BatchHandler {
    async fn run(ctx: &RequestContext, operation: &Map<String, Value>) -> Value {
        let response = match Self::execute(ctx, operation).await {
            Ok(response) => response,
            Err(err) => {
                debug!("Batch operation failed: {}", err);
                err.to_response()
            }
        };

        let mut entry = Map::new();
        if let Some(operation_id) = operation.get(OPERATION_ID_KEY) {
            entry.insert(OPERATION_ID_KEY.to_string(), operation_id.clone());
        }
        entry.insert(RESULT_KEY.to_string(), Value::Array(vec![response.to_value()]));
        Value::Object(entry)
    }

    async fn execute(
        ctx: &RequestContext,
        operation: &Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let method = match operation.get(METHOD_KEY) {
            None => Method::GET,
            Some(Value::String(method)) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ApiError::bad_request(format!("Invalid batch method '{}'", method)))?,
            Some(_) => return Err(ApiError::bad_request("Batch method must be a string")),
        };
        if method != Method::GET {
            return Err(ApiError::not_implemented(format!(
                "Batch operation method '{}' not supported",
                method
            )));
        }

        let resource = optional_string(operation, RESOURCE_KEY)?
            .ok_or_else(|| ApiError::bad_request("Batch operation without a resource"))?;
        let handler = ctx
            .state
            .resources
            .get(resource)
            .ok_or_else(|| ApiError::not_found(format!("Resource '{}' not found", resource)))?;

        check_access(handler.as_ref(), ctx.user.as_ref(), &method)?;
        if !handler.implements(&method) {
            return Err(ApiError::not_implemented("Method not implemented"));
        }

        let pairs: Vec<(String, String)> = match optional_string(operation, QUERY_KEY)? {
            Some(query) => url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect(),
            None => Vec::new(),
        };
        let query = ListQuery::from_pairs(&pairs, handler.searchable_keys(), &ctx.state.config.api)?;
        let document = optional_string(operation, DOCUMENT_KEY)?;

        handler.get(ctx, document, &query).await
    }
}

fn optional_string<'a>(
    operation: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, ApiError> {
    match operation.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ApiError::bad_request(format!("Batch key '{}' must be a string", key))),
    }
}

#[async_trait]
impl ResourceHandler for BatchHandler {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn implements(&self, method: &Method) -> bool {
        *method == Method::POST
    }

    /// Operations are reads, so the batch itself only needs read permission.
    fn permission_for(&self, _method: &Method) -> Method {
        Method::GET
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let body = Value::Object(body);
        if !validate_batch(&body, BATCH_KEY, OPERATION_KEYS) {
            return Err(ApiError::bad_request(
                "Provided JSON data is not a valid batch operation",
            ));
        }

        let operations: Vec<&Map<String, Value>> = body
            .get(BATCH_KEY)
            .and_then(Value::as_array)
            .map(|operations| operations.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default();
        info!("Running batch of {} operations", operations.len());

        let results = join_all(operations.into_iter().map(|operation| Self::run(ctx, operation))).await;

        let mut response = HandlerResponse::new(StatusCode::OK);
        response.set_results(results);
        Ok(response)
    }
}
