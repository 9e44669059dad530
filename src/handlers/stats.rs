use async_trait::async_trait;
use axum::http::Method;

use crate::api::HandlerResponse;
use crate::error::ApiError;
use crate::models::keys::{DAILY_STATS_COLLECTION, ID_KEY, VERSION_KEY};

use super::crud;
use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

/// /statistics - read-only daily statistics
#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticsHandler;

#[async_trait]
impl ResourceHandler for StatisticsHandler {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn implements(&self, method: &Method) -> bool {
        *method == Method::GET
    }

    fn searchable_keys(&self) -> &'static [&'static str] {
        &[ID_KEY, VERSION_KEY]
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        match id {
            Some(id) => crud::find_by_id(ctx, DAILY_STATS_COLLECTION, id).await,
            None => crud::list(ctx, DAILY_STATS_COLLECTION, query).await,
        }
    }
}
