//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::router::router;
use super::state::AppState;
use crate::error::{MarqueeError, Result};

/// HTTP server for the movie API.
pub struct HttpServer {
    /// Bound listener
    listener: TcpListener,
    /// Shared application state
    state: AppState,
}

impl HttpServer {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server stops accepting connections when `signal` resolves and
    /// returns once in-flight requests have completed.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        let app = router(self.state).into_make_service_with_connect_info::<SocketAddr>();

        info!(addr = %addr, "Starting HTTP server with graceful shutdown");

        axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                MarqueeError::Io(e)
            })
    }
}
