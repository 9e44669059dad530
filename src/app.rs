use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, MethodRouter},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::handlers::{
    dispatch, health, BatchHandler, LabHandler, ResourceHandler, StatisticsHandler,
    TestCaseHandler, TokenHandler, VersionHandler,
};
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let api = &state.config.api;
    let body_limit = api.max_request_size_bytes;
    let request_logging = api.enable_request_logging;
    let cors = cors_layer(&state.config.security);

    let router = Router::new()
        .route("/health", get(health))
        .merge(resource_routes())
        .fallback(dispatch::resource_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };
    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/token", collection::<TokenHandler>())
        .route("/token/", collection::<TokenHandler>())
        .route("/token/:id", document::<TokenHandler>())
        .route("/test/case", collection::<TestCaseHandler>())
        .route("/test/case/", collection::<TestCaseHandler>())
        .route("/test/case/:id", document::<TestCaseHandler>())
        .route("/lab", collection::<LabHandler>())
        .route("/lab/", collection::<LabHandler>())
        .route("/lab/:id", document::<LabHandler>())
        .route("/statistics", collection::<StatisticsHandler>())
        .route("/version", collection::<VersionHandler>())
        .route("/batch", collection::<BatchHandler>())
}

/// Every verb on a collection path; unlisted verbs answer 501.
fn collection<H>() -> MethodRouter<AppState>
where
    H: ResourceHandler + Default + 'static,
{
    get(dispatch::get_collection::<H>)
        .post(dispatch::post_collection::<H>)
        .put(dispatch::put_collection::<H>)
        .delete(dispatch::delete_collection::<H>)
        .fallback(dispatch::method_not_implemented)
}

fn document<H>() -> MethodRouter<AppState>
where
    H: ResourceHandler + Default + 'static,
{
    get(dispatch::get_document::<H>)
        .post(dispatch::post_document::<H>)
        .put(dispatch::put_document::<H>)
        .delete(dispatch::delete_document::<H>)
        .fallback(dispatch::method_not_implemented)
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
