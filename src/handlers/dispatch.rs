//! Request pipeline shared by every resource.
//!
//! Each entry point authenticates the caller, checks that the resource serves
//! the verb, then (for writes) checks the content type, parses and validates
//! the body before handing over to the resource.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, Method},
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::HandlerResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::middleware::{authenticate, Credentials};
use crate::state::AppState;
use crate::validator::{validate_keys, ValidationError};

use super::query::ListQuery;
use super::resource::{not_implemented, RequestContext, ResourceHandler};

const ADMIN_REASON: &str = "Operation not permitted: admin rights required";

/// Check that an already resolved caller may use `method` on `handler`.
pub fn check_access(
    handler: &dyn ResourceHandler,
    user: Option<&AuthUser>,
    method: &Method,
) -> Result<(), ApiError> {
    if !handler.requires_auth(method) {
        return Ok(());
    }
    let Some(user) = user else {
        return Err(ApiError::forbidden("Operation not permitted"));
    };
    if !user.permits(&handler.permission_for(method)) {
        return Err(ApiError::forbidden("Operation not permitted: token lacks permission"));
    }
    if handler.requires_admin(method) && !user.is_admin() {
        return Err(ApiError::forbidden(ADMIN_REASON));
    }
    Ok(())
}

async fn begin(
    handler: &dyn ResourceHandler,
    state: AppState,
    credentials: &Credentials,
    method: &Method,
) -> Result<RequestContext, ApiError> {
    let user = if handler.requires_auth(method) {
        let user = authenticate(&state, credentials, &handler.permission_for(method)).await?;
        if handler.requires_admin(method) && !user.is_admin() {
            warn!("Non-admin token refused for {} on {}", method, handler.name());
            return Err(ApiError::forbidden(ADMIN_REASON));
        }
        Some(user)
    } else {
        None
    };

    if !handler.implements(method) {
        debug!("{} does not implement {}", handler.name(), method);
        return Err(not_implemented());
    }

    Ok(RequestContext { state, user })
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Parse a write body. Returns the accepted keys and the warning about
/// dropped ones.
fn read_body(
    handler: &dyn ResourceHandler,
    method: &Method,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<(Map<String, Value>, Option<String>), ApiError> {
    if !is_json_content(headers) {
        return Err(ApiError::unsupported_media_type(
            "Content-Type must be application/json",
        ));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::unprocessable_entity("No JSON data found"));
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        ApiError::unprocessable_entity("Unable to parse JSON data")
    })?;

    match handler.valid_keys(method) {
        Some(schema) => {
            let validated = validate_keys(&value, &schema)?;
            let warning = validated.warning();
            Ok((validated.body, warning))
        }
        None => match value {
            Value::Object(object) => Ok((object, None)),
            _ => Err(ValidationError::NotJson.into()),
        },
    }
}

fn with_warning(mut response: HandlerResponse, warning: Option<String>) -> HandlerResponse {
    if let Some(warning) = warning {
        response.add_message(warning);
    }
    response
}

/// GET /<resource> - list documents
pub async fn get_collection<H>(
    State(state): State<AppState>,
    credentials: Credentials,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::GET).await?;
    let query = ListQuery::from_pairs(&pairs, handler.searchable_keys(), &ctx.state.config.api)?;
    handler.get(&ctx, None, &query).await
}

/// GET /<resource>/:id - show one document
pub async fn get_document<H>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credentials: Credentials,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::GET).await?;
    let query = ListQuery::from_pairs(&pairs, handler.searchable_keys(), &ctx.state.config.api)?;
    handler.get(&ctx, Some(&id), &query).await
}

/// POST /<resource> - create a document
pub async fn post_collection<H>(
    State(state): State<AppState>,
    credentials: Credentials,
    headers: HeaderMap,
    body: Bytes,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::POST).await?;
    let (body, warning) = read_body(&handler, &Method::POST, &headers, &body)?;
    let response = handler.post(&ctx, body).await?;
    Ok(with_warning(response, warning))
}

/// POST /<resource>/:id - always rejected, documents are created on the collection
pub async fn post_document<H>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credentials: Credentials,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    begin(&handler, state, &credentials, &Method::POST).await?;
    debug!("POST with document id '{}' on {}", id, handler.name());
    Err(ApiError::bad_request("A document ID cannot be specified with POST"))
}

/// PUT /<resource> - update without an id, left to the resource to reject
pub async fn put_collection<H>(
    State(state): State<AppState>,
    credentials: Credentials,
    headers: HeaderMap,
    body: Bytes,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::PUT).await?;
    let (body, warning) = read_body(&handler, &Method::PUT, &headers, &body)?;
    let response = handler.put(&ctx, None, body).await?;
    Ok(with_warning(response, warning))
}

/// PUT /<resource>/:id - update one document
pub async fn put_document<H>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credentials: Credentials,
    headers: HeaderMap,
    body: Bytes,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::PUT).await?;
    let (body, warning) = read_body(&handler, &Method::PUT, &headers, &body)?;
    let response = handler.put(&ctx, Some(&id), body).await?;
    Ok(with_warning(response, warning))
}

/// DELETE /<resource>
pub async fn delete_collection<H>(
    State(state): State<AppState>,
    credentials: Credentials,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::DELETE).await?;
    handler.delete(&ctx, None).await
}

/// DELETE /<resource>/:id - remove one document
pub async fn delete_document<H>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credentials: Credentials,
) -> Result<HandlerResponse, ApiError>
where
    H: ResourceHandler + Default + 'static,
{
    let handler = H::default();
    let ctx = begin(&handler, state, &credentials, &Method::DELETE).await?;
    handler.delete(&ctx, Some(&id)).await
}

/// Any verb the router does not list for a path.
pub async fn method_not_implemented() -> ApiError {
    not_implemented()
}

/// Paths no resource serves.
pub async fn resource_not_found() -> ApiError {
    ApiError::not_found("Resource not found")
}
