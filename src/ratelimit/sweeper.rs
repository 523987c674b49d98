//! Background eviction of idle rate limit clients.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Spawn a task that sweeps `limiter` every `interval`.
///
/// The first sweep happens one full interval after spawning. The task
/// exits when `shutdown` is cancelled.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Rate limit sweeper started");

        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tick.tick().await; // Skip immediate first tick

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = limiter.sweep();
                    debug!(removed, tracked = limiter.client_count(), "Rate limit sweep finished");
                }
                _ = shutdown.cancelled() => {
                    info!("Rate limit sweeper shutting down");
                    break;
                }
            }
        }
    })
}
