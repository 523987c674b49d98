//! Route table and middleware stack.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::error::{panic_response, ApiError};
use super::health::healthcheck;
use super::middleware::rate_limit;
use super::movies::{create_movie, delete_movie, list_movies, show_movie, update_movie};
use super::state::AppState;

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/v1/healthcheck",
            get(healthcheck).fallback(method_not_allowed),
        )
        .route(
            "/v1/movies",
            get(list_movies)
                .post(create_movie)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/movies/:id",
            get(show_movie)
                .patch(update_movie)
                .delete(delete_movie)
                .fallback(method_not_allowed),
        )
        .fallback(not_found);

    with_middleware(routes, state)
}

/// Wrap `routes` in the shared middleware stack.
///
/// Layers, outermost first: panic recovery, request tracing, body size
/// limit, rate limiting. Each wraps every matched route and the fallback,
/// so they run after routing but before any handler, and unknown paths
/// still consume tokens.
fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    routes
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}
