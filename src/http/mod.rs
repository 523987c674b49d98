//! HTTP API: routing, middleware and handlers.

mod error;
mod health;
mod identity;
mod json;
mod middleware;
mod movies;
mod router;
mod server;
mod state;

pub use error::{ApiError, SERVER_ERROR_MESSAGE};
pub use identity::client_identity;
pub use router::router;
pub use server::HttpServer;
pub use state::AppState;
