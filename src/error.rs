// HTTP API Error Types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response::{HandlerResponse, ResponseError};
use crate::database::DatabaseError;
use crate::models::ModelError;
use crate::validator::ValidationError;

/// HTTP API error with appropriate status codes and client-friendly messages.
/// Every variant is written on the wire as an envelope carrying `reason`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 415 Unsupported Media Type
    UnsupportedMediaType(String),

    // 422 Unprocessable Entity (body missing or not JSON)
    UnprocessableEntity(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 501 Not Implemented
    NotImplemented(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::NotImplemented(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Envelope describing this error.
    pub fn to_response(&self) -> HandlerResponse {
        let mut response = HandlerResponse::new(self.status_code());
        response.set_reason(self.message());
        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        ApiError::UnsupportedMediaType(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        ApiError::UnprocessableEntity(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        ApiError::NotImplemented(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::ConfigMissing(what) => {
                tracing::error!("Database configuration missing: {}", what);
                ApiError::service_unavailable("Database not configured")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal datastore errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Mongo(mongo_err) => {
                // Log the real error but return generic message
                tracing::error!("MongoDB error: {}", mongo_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<ResponseError> for ApiError {
    fn from(err: ResponseError) -> Self {
        tracing::error!("Failed to build response: {}", err);
        ApiError::internal_server_error("Failed to build response")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}
