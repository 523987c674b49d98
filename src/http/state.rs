//! Shared state handed to every handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::movies::MovieStore;
use crate::ratelimit::RateLimiter;

/// Application state shared across requests.
#[derive(Clone)]
pub struct AppState {
    /// Per-client rate limiter
    pub limiter: Arc<RateLimiter>,
    /// Movie storage backend
    pub movies: Arc<dyn MovieStore>,
    /// Deployment environment, reported by the healthcheck
    pub environment: Arc<str>,
    /// Trust proxy headers when identifying clients
    pub trust_proxy: bool,
    /// Request body size limit
    pub max_body_bytes: usize,
}

impl AppState {
    /// Build state from configuration and already-constructed components.
    pub fn new(config: &AppConfig, limiter: Arc<RateLimiter>, movies: Arc<dyn MovieStore>) -> Self {
        Self {
            limiter,
            movies,
            environment: Arc::from(config.server.environment.as_str()),
            trust_proxy: config.server.trust_proxy,
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}
