use axum::http::StatusCode;
use bson::{doc, oid::ObjectId, Document};
use tracing::info;

use crate::api::HandlerResponse;
use crate::database::document_to_json;
use crate::error::ApiError;
use crate::models::keys::ID_KEY;
use crate::validator::parse_object_id;

use super::query::ListQuery;
use super::resource::RequestContext;

/// Id of a PUT or DELETE target: present and a valid ObjectId.
pub fn require_id(id: Option<&str>) -> Result<ObjectId, ApiError> {
    let id = id.ok_or_else(|| ApiError::bad_request("No document ID specified"))?;
    parse_object_id(id).ok_or_else(|| ApiError::bad_request(format!("Invalid document ID '{}'", id)))
}

/// List `collection` using the query's filter and window.
pub async fn list(
    ctx: &RequestContext,
    collection: &str,
    query: &ListQuery,
) -> Result<HandlerResponse, ApiError> {
    let store = &ctx.state.store;
    let count = store.count(collection, query.filter.clone()).await?;
    let documents = store
        .find(collection, query.filter.clone(), query.page)
        .await?;

    let mut response = HandlerResponse::new(StatusCode::OK);
    response.set_count(count);
    response.set_limit(query.limit);
    response.set_skip(query.page.skip);
    response.set_results(documents.into_iter().map(document_to_json));
    Ok(response)
}

/// Stored document matching `filter`, 404 when there is none.
pub async fn load(
    ctx: &RequestContext,
    collection: &str,
    filter: Document,
    what: &str,
) -> Result<Document, ApiError> {
    ctx.state
        .store
        .find_one(collection, filter)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Resource '{}' not found", what)))
}

/// Single document response.
pub fn one(document: Document) -> HandlerResponse {
    let mut response = HandlerResponse::new(StatusCode::OK);
    response.set_count(1u64);
    response.set_result(document_to_json(document));
    response
}

/// GET by object id.
pub async fn find_by_id(
    ctx: &RequestContext,
    collection: &str,
    id: &str,
) -> Result<HandlerResponse, ApiError> {
    let object_id =
        parse_object_id(id).ok_or_else(|| ApiError::bad_request(format!("Invalid document ID '{}'", id)))?;
    let document = load(ctx, collection, doc! { ID_KEY: object_id }, id).await?;
    Ok(one(document))
}

/// Insert and answer 201 with the new document's location.
pub async fn create(
    ctx: &RequestContext,
    collection: &str,
    document: Document,
    path: &str,
) -> Result<(ObjectId, HandlerResponse), ApiError> {
    let id = ctx.state.store.insert(collection, document).await?;
    info!("Created {} in {}", id, collection);

    let mut response = HandlerResponse::created(&format!("{}/{}", path, id.to_hex()))?;
    response.set_reason(format!("Resource '{}' created", id.to_hex()));
    Ok((id, response))
}

/// `$set` fields on an existing document.
pub async fn update(
    ctx: &RequestContext,
    collection: &str,
    id: ObjectId,
    set: Document,
) -> Result<HandlerResponse, ApiError> {
    let matched = ctx
        .state
        .store
        .update(collection, doc! { ID_KEY: id }, set)
        .await?;
    if matched == 0 {
        return Err(ApiError::not_found(format!("Resource '{}' not found", id.to_hex())));
    }
    info!("Updated {} in {}", id, collection);

    let mut response = HandlerResponse::new(StatusCode::OK);
    response.set_reason(format!("Resource '{}' updated", id.to_hex()));
    Ok(response)
}

/// DELETE by object id.
pub async fn delete_by_id(
    ctx: &RequestContext,
    collection: &str,
    id: Option<&str>,
) -> Result<HandlerResponse, ApiError> {
    let id = require_id(id)?;
    let deleted = ctx
        .state
        .store
        .delete(collection, doc! { ID_KEY: id })
        .await?;
    if deleted == 0 {
        return Err(ApiError::not_found(format!("Resource '{}' not found", id.to_hex())));
    }
    info!("Deleted {} from {}", id, collection);

    let mut response = HandlerResponse::new(StatusCode::OK);
    response.set_reason(format!("Resource '{}' deleted", id.to_hex()));
    Ok(response)
}
