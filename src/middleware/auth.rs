use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
};
use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

const FORBIDDEN_REASON: &str = "Operation not permitted: provided token is not authorized";

/// Token and caller address of a request, before any check is made.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub token: Option<String>,
    pub remote: Option<IpAddr>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let token = match extract_token_from_headers(&parts.headers) {
            Ok(token) => Some(token),
            Err(msg) => {
                debug!("No usable token: {}", msg);
                None
            }
        };

        Ok(Self {
            token,
            remote: remote_ip(&parts.headers, peer),
        })
    }
}

/// Extract the token from the Authorization header, raw or in Bearer form.
pub fn extract_token_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    if token.is_empty() {
        return Err("Empty token".to_string());
    }
    Ok(token.to_string())
}

/// Caller address: X-Real-IP, then the first X-Forwarded-For hop, then the peer.
pub fn remote_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    };

    header_ip("x-real-ip")
        .or_else(|| header_ip("x-forwarded-for"))
        .or(peer)
}

/// Resolve the caller behind `credentials` for a request using `method`.
///
/// The configured master key grants everything; any other token goes through
/// the state's token validator.
pub async fn authenticate(
    state: &AppState,
    credentials: &Credentials,
    method: &Method,
) -> Result<AuthUser, ApiError> {
    let Some(token) = credentials.token.as_deref() else {
        return Err(ApiError::forbidden(FORBIDDEN_REASON));
    };

    if let Some(master_key) = state.config.security.master_key.as_deref() {
        if !master_key.is_empty() && token == master_key {
            debug!("Master key used for {}", method);
            return Ok(AuthUser::master());
        }
    }

    match state
        .validator
        .validate(token, method, credentials.remote)
        .await?
    {
        Some(user) => Ok(user),
        None => {
            warn!("Rejected token for {} from {:?}", method, credentials.remote);
            Err(ApiError::forbidden(FORBIDDEN_REASON))
        }
    }
}
