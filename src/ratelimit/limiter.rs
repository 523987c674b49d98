//! Per-client rate limiter registry.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::bucket::TokenBucket;
use super::clock::{Clock, SystemClock};
use crate::config::LimiterConfig;

/// Rate limit state for a single client identity.
#[derive(Debug)]
struct ClientEntry {
    /// Token bucket for this client
    bucket: TokenBucket,
    /// Last time this client asked for a decision, used only for eviction
    last_seen: Instant,
}

/// Registry of per-client token buckets.
///
/// Entries are created lazily on a client's first request and removed by
/// [`RateLimiter::sweep`] once idle for longer than the configured
/// threshold. The map is sharded, so clients in different shards never
/// contend; all access to a given entry (lookup, create, refill, consume,
/// evict) happens under its shard's write lock.
pub struct RateLimiter {
    /// Buckets keyed by client identity
    clients: DashMap<String, ClientEntry>,
    /// When false every request is allowed and no state is kept
    enabled: bool,
    /// Tokens added per second
    rate: f64,
    /// Bucket capacity
    burst: u32,
    /// How long an entry may sit idle before a sweep removes it
    idle_threshold: Duration,
    /// Time source for refill and eviction
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter backed by the system clock.
    ///
    /// `config` is expected to have been validated already; a zero rate or
    /// burst is not rejected here.
    pub fn new(config: &LimiterConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rate limiter with an explicit time source.
    pub fn with_clock(config: &LimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: DashMap::new(),
            enabled: config.enabled,
            rate: config.rps,
            burst: config.burst,
            idle_threshold: config.idle_threshold(),
            clock,
        }
    }

    /// Decide whether a request from `identity` may proceed.
    ///
    /// Consumes one token on success. A denied request consumes nothing but
    /// still refreshes the client's last-seen time.
    pub fn allow(&self, identity: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let now = self.clock.now();

        let mut entry = self
            .clients
            .entry(identity.to_string())
            .or_insert_with(|| {
                debug!(client = %identity, burst = self.burst, rate = self.rate, "Tracking new client");
                ClientEntry {
                    bucket: TokenBucket::new(self.burst, self.rate, now),
                    last_seen: now,
                }
            });

        // `now` was read before the shard lock; never move backwards
        entry.last_seen = entry.last_seen.max(now);
        let allowed = entry.bucket.try_consume(now);

        trace!(
            client = %identity,
            allowed,
            tokens = entry.bucket.available(),
            "Rate limit decision"
        );

        allowed
    }

    /// Remove every client idle for longer than the threshold.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let threshold = self.idle_threshold;
        let mut removed = 0;

        self.clients.retain(|_, entry| {
            // Entries created after `now` was read saturate to zero idle time
            let keep = now.saturating_duration_since(entry.last_seen) <= threshold;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(
                removed,
                remaining = self.clients.len(),
                "Evicted idle rate limit clients"
            );
        }

        removed
    }

    /// Whether limiting is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Tokens available to `identity` as of its last request.
    ///
    /// Returns `None` if the client is not tracked.
    pub fn available_tokens(&self, identity: &str) -> Option<f64> {
        self.clients.get(identity).map(|e| e.bucket.available())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("enabled", &self.enabled)
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .field("idle_threshold", &self.idle_threshold)
            .field("clients", &self.clients.len())
            .finish()
    }
}
