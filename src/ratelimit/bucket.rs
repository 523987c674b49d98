//! Token bucket state for a single client.

use std::time::Instant;

/// A token bucket that refills continuously.
///
/// Tokens are fractional so that slow refill rates accumulate between
/// requests instead of being rounded away.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Maximum number of tokens (the burst size)
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Tokens currently available, always within `[0, capacity]`
    tokens: f64,
    /// When tokens were last added
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Add the tokens earned since the last refill, capped at capacity.
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = self.last_refill.max(now);
    }

    /// Refill, then take one token if a whole one is available.
    ///
    /// Returns `true` if a token was consumed.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available (as of the last refill).
    pub fn available(&self) -> f64 {
        self.tokens
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
