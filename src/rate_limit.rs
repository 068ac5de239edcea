//! Rate limiting for public and operator endpoints.
//!
//! Two layers:
//! - Per-IP: a `tower_governor` layer on the public contact route
//!   (RATE_LIMIT_CONTACT_RPM, default 10, 0 disables).
//! - Per-key: a sliding-window counter held in `AppState`, keyed by
//!   submitter email for the contact form and by a fixed key for proposal sends.
//!
//! Both live in process memory. They reset on restart and are not shared
//! between instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;

/// Contact submissions allowed per email per window.
pub const CONTACT_MAX_PER_EMAIL: usize = 5;
pub const CONTACT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Proposal sends allowed per window across all operators.
pub const PROPOSAL_MAX_SENDS: usize = 20;
pub const PROPOSAL_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const PROPOSAL_KEY: &str = "proposal:send";

/// Sliding-window counter keyed by an arbitrary string.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key` and return whether it is within `max` per `window`.
    /// Rejected attempts are recorded too, so a client that keeps retrying stays limited.
    fn check(&self, key: &str, max: usize, window: Duration) -> bool;
}

/// In-memory `RateLimiter`.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys with no hits inside `window`.
    pub fn sweep(&self, window: Duration) {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        hits.retain(|_, stamps| {
            stamps.retain(|t| now.duration_since(*t) < window);
            !stamps.is_empty()
        });
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str, max: usize, window: Duration) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let stamps = hits.entry(key.to_owned()).or_default();
        stamps.retain(|t| now.duration_since(*t) < window);
        stamps.push(now);
        stamps.len() <= max
    }
}

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-IP layer allowing `requests_per_minute`, replenished evenly over the minute.
pub fn contact_layer(requests_per_minute: u32) -> RateLimitLayer {
    assert!(requests_per_minute > 0, "Rate limit must be greater than 0");

    let period_secs = 60 / requests_per_minute as u64;
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs.max(1)))
        .burst_size(requests_per_minute)
        .finish()
        .expect("Failed to build rate limiter config");

    GovernorLayer::new(Arc::new(config))
}
