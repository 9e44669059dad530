use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::api::HandlerResponse;
use crate::error::ApiError;

use super::query::ListQuery;
use super::resource::{RequestContext, ResourceHandler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn full_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), VERSION)
}

/// /version - public, answers GET only
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionHandler;

#[async_trait]
impl ResourceHandler for VersionHandler {
    fn name(&self) -> &'static str {
        "version"
    }

    fn implements(&self, method: &Method) -> bool {
        *method == Method::GET
    }

    fn requires_auth(&self, _method: &Method) -> bool {
        false
    }

    async fn get(
        &self,
        _ctx: &RequestContext,
        _id: Option<&str>,
        _query: &ListQuery,
    ) -> Result<HandlerResponse, ApiError> {
        let mut response = HandlerResponse::new(StatusCode::OK);
        response.set_result(json!({
            "version": VERSION,
            "full_version": full_version(),
        }));
        Ok(response)
    }
}
