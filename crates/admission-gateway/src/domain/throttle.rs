//! Token-bucket throttling per functionality.
//!
//! Buckets refill lazily: available tokens are computed from the time
//! elapsed since the last withdrawal attempt, clamped to capacity.
//! There is no background refill task.

use crate::domain::config::ThrottleConfig;
use crate::domain::types::{Functionality, Timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill_ms: Timestamp,
}

/// A single lazily-refilled token bucket.
#[derive(Debug)]
pub struct ThrottleBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl ThrottleBucket {
    /// New bucket, created full.
    pub fn new(capacity: f64, refill_per_sec: f64, now: Timestamp) -> Self {
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill_ms: now,
            }),
        }
    }

    /// Refill for elapsed time, then withdraw one token if available.
    ///
    /// Tokens stay in `[0, capacity]`. The lock covers exactly the
    /// refill-and-withdraw step.
    pub fn try_withdraw(&self, now: Timestamp) -> bool {
        let mut state = self.state.lock();

        let elapsed_ms = now.saturating_sub(state.last_refill_ms);
        let refilled = state.tokens + (elapsed_ms as f64 / 1000.0) * self.refill_per_sec;
        state.tokens = refilled.min(self.capacity);
        state.last_refill_ms = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Currently available tokens, after a refill for elapsed time.
    pub fn available(&self, now: Timestamp) -> f64 {
        let state = self.state.lock();
        let elapsed_ms = now.saturating_sub(state.last_refill_ms);
        (state.tokens + (elapsed_ms as f64 / 1000.0) * self.refill_per_sec).min(self.capacity)
    }
}

/// Throttle gate for the transaction pipeline: one bucket per
/// transaction functionality, plus an optional node-wide bucket.
pub struct ThrottleGate {
    buckets: HashMap<Functionality, ThrottleBucket>,
    node_bucket: Option<ThrottleBucket>,
}

impl ThrottleGate {
    /// Build the bucket table once at startup. Every transaction tag
    /// gets a bucket, sized per config or the default.
    pub fn new(config: &ThrottleConfig, now: Timestamp) -> Self {
        let buckets = Functionality::TRANSACTIONS
            .into_iter()
            .map(|tag| {
                let sizing = config.bucket_for(tag);
                (
                    tag,
                    ThrottleBucket::new(sizing.capacity, sizing.refill_per_sec, now),
                )
            })
            .collect();

        let node_bucket = config
            .node_bucket
            .map(|sizing| ThrottleBucket::new(sizing.capacity, sizing.refill_per_sec, now));

        Self {
            buckets,
            node_bucket,
        }
    }

    /// Withdraw one token for `functionality`.
    ///
    /// The functionality bucket is charged first, then the node bucket.
    /// A node-bucket rejection does not refund the functionality token;
    /// spent tokens stay spent.
    pub fn try_admit(&self, functionality: Functionality, now: Timestamp) -> bool {
        if let Some(bucket) = self.buckets.get(&functionality) {
            if !bucket.try_withdraw(now) {
                debug!(functionality = ?functionality, "throttle: functionality bucket empty");
                return false;
            }
        }

        if let Some(node) = &self.node_bucket {
            if !node.try_withdraw(now) {
                debug!(functionality = ?functionality, "throttle: node bucket empty");
                return false;
            }
        }

        true
    }
}
