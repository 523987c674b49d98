//! Per-client token bucket rate limiting.

mod bucket;
mod clock;
mod limiter;
mod sweeper;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::RateLimiter;
pub use sweeper::spawn_sweeper;
