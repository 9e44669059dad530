use axum::{extract::State, http::StatusCode};
use serde_json::json;
use tracing::error;

use crate::api::HandlerResponse;
use crate::state::AppState;

/// GET /health - liveness plus datastore reachability
pub async fn health(State(state): State<AppState>) -> HandlerResponse {
    match state.store.ping().await {
        Ok(()) => {
            let mut response = HandlerResponse::new(StatusCode::OK);
            response.set_result(json!({ "status": "ok", "database": "ok" }));
            response
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            let mut response = HandlerResponse::new(StatusCode::SERVICE_UNAVAILABLE);
            response.set_reason("Database unreachable");
            response.set_result(json!({ "status": "degraded", "database": "unreachable" }));
            response
        }
    }
}
