//! Per-sender admission control.
//!
//! Token-bucket (GCRA) limiting keyed by sender-channel id, configured as N
//! events per W-second window. State lives in a `DashMap`-backed keyed
//! limiter so unrelated senders never contend on a shared lock, and
//! concurrent calls for the same sender cannot admit past the quota.
//!
//! # Memory
//!
//! The limiter tracks every sender it has seen. Senders seen once and never
//! again are reclaimed by a periodic cleanup pass (`spawn_cleanup_task`);
//! eviction does not change admission semantics for active senders.

use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use satchel_core::RateLimitConfig;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Type alias for the keyed rate limiter over sender-channel ids.
type KeyedLimiter = RateLimiter<i64, DashMap<i64, InMemoryState>, DefaultClock, NoOpMiddleware>;

/// Per-sender admission gate.
pub struct SenderLimiter {
    limiter: KeyedLimiter,
}

impl SenderLimiter {
    /// Create a limiter admitting `max_per_window` events per sender per
    /// `window_secs`-second window.
    pub fn new(config: &RateLimitConfig) -> Self {
        let max = NonZeroU32::new(config.max_per_window).unwrap_or(NonZeroU32::MIN);
        let window = Duration::from_secs(config.window_secs.max(1));
        let quota = Quota::with_period(window / max.get())
            .unwrap_or_else(|| Quota::per_minute(max))
            .allow_burst(max);

        Self {
            limiter: RateLimiter::dashmap(quota),
        }
    }

    /// Admit or throttle one event for a sender.
    ///
    /// Allowed calls consume one unit of the sender's quota; throttled calls
    /// consume nothing and carry a retry-after hint derived from the window,
    /// rounded up to the next whole second.
    pub fn admit(&self, chat_id: i64) -> EngineResult<()> {
        match self.limiter.check_key(&chat_id) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait =
                    not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
                tracing::debug!(chat_id, wait_secs = wait.as_secs(), "sender throttled");
                Err(EngineError::Throttled {
                    retry_after: Duration::from_secs(wait.as_secs() + 1),
                })
            }
        }
    }

    /// Number of senders currently tracked.
    pub fn tracked_senders(&self) -> usize {
        self.limiter.len()
    }

    /// Evict senders whose state has fully replenished (idle senders).
    ///
    /// Returns the number of entries reclaimed.
    pub fn evict_idle(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }
}

/// Spawn a background task that periodically evicts idle senders.
pub fn spawn_cleanup_task(
    limiter: Arc<SenderLimiter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = limiter.evict_idle();
            if evicted > 0 {
                tracing::debug!(evicted, "rate limiter evicted idle senders");
            }
        }
    })
}
