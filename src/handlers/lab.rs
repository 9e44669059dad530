use async_trait::async_trait;
use axum::http::Method;
use bson::{doc, oid::ObjectId};
use serde_json::{Map, Value};

use crate::api::HandlerResponse;
use crate::error::ApiError;
use crate::models::keys::*;
use crate::models::{DocumentModel, Lab};
use crate::validator::{validate_contact, KeySchema};

use super::crud;
use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

const LAB_KEYS: &[&str] = &[NAME_KEY, CONTACT_KEY, ADDRESS_KEY, PRIVATE_KEY, DESCRIPTION_KEY];

/// /lab - labs submitting results. Anyone with a token may read, writes need admin.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabHandler;

impl LabHandler {
    /// Reject a name already taken by a lab other than `except`.
    async fn check_unique_name(
        ctx: &RequestContext,
        name: &str,
        except: Option<ObjectId>,
    ) -> Result<(), ApiError> {
        let existing = ctx
            .state
            .store
            .find_one(LAB_COLLECTION, doc! { NAME_KEY: name })
            .await?;
        match existing {
            Some(lab) if except.map_or(true, |id| lab.get_object_id(ID_KEY).ok() != Some(id)) => Err(
                ApiError::bad_request(format!("Lab with name '{}' already exists", name)),
            ),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ResourceHandler for LabHandler {
    fn name(&self) -> &'static str {
        "lab"
    }

    fn implements(&self, method: &Method) -> bool {
        matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE)
    }

    fn requires_admin(&self, method: &Method) -> bool {
        *method != Method::GET
    }

    fn valid_keys(&self, method: &Method) -> Option<KeySchema> {
        match *method {
            Method::POST => Some(KeySchema::Structured {
                mandatory: &[NAME_KEY, CONTACT_KEY],
                accepted: LAB_KEYS,
            }),
            Method::PUT => Some(KeySchema::Accepted(LAB_KEYS)),
            _ => None,
        }
    }

    fn searchable_keys(&self) -> &'static [&'static str] {
        &[ID_KEY, NAME_KEY, PRIVATE_KEY]
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        match id {
            Some(id) => crud::find_by_id(ctx, LAB_COLLECTION, id).await,
            None => crud::list(ctx, LAB_COLLECTION, query).await,
        }
    }

    async fn post(
        &self,
        ctx: &RequestContext,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        validate_contact(&body)?;
        let lab = Lab::from_json(&body)?;
        Self::check_unique_name(ctx, &lab.name, None).await?;

        let (_, response) = crud::create(ctx, LAB_COLLECTION, lab.to_document(), "/lab").await?;
        Ok(response)
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        body: Map<String, Value>,
    ) -> Result<HandlerResponse, ApiError> {
        let id = crud::require_id(id)?;
        if body.contains_key(CONTACT_KEY) {
            validate_contact(&body)?;
        }
        let stored = crud::load(ctx, LAB_COLLECTION, doc! { ID_KEY: id }, &id.to_hex()).await?;

        let mut lab = Lab::from_document(&stored)?;
        lab.apply_json(&body)?;
        Self::check_unique_name(ctx, &lab.name, Some(id)).await?;

        crud::update(ctx, LAB_COLLECTION, id, lab.to_document()).await
    }

    async fn delete(&self, ctx: &RequestContext, id: Option<&str>) -> Result<HandlerResponse, ApiError> {
        crud::delete_by_id(ctx, LAB_COLLECTION, id).await
    }
}
