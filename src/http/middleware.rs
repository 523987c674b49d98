//! Per-client rate limiting middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::debug;

use super::error::ApiError;
use super::identity::client_identity;
use super::state::AppState;

/// Reject requests from clients that have used up their token bucket.
///
/// Wraps every route and the fallback, so it runs after routing but a
/// rejected request never reaches a handler.
pub async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.limiter.is_enabled() {
        let identity = client_identity(peer, request.headers(), state.trust_proxy);

        if !state.limiter.allow(&identity) {
            debug!(
                client = %identity,
                method = %request.method(),
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            return ApiError::RateLimitExceeded.into_response();
        }
    }

    next.run(request).await
}
