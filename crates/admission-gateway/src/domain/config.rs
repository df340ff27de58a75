//! Gateway configuration.
//!
//! All numeric limits are injected by the operator; the `Default`
//! impls are test-friendly values, not protocol constants.

use crate::domain::types::Functionality;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token bucket sizing: capacity and steady-state refill rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum tokens the bucket holds.
    pub capacity: f64,
    /// Tokens restored per second.
    pub refill_per_sec: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            refill_per_sec: 100.0,
        }
    }
}

/// Throttle table: one bucket per functionality plus an optional
/// node-wide bucket shared by every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Applied to any functionality without an explicit entry.
    pub default_bucket: BucketConfig,
    /// Per-functionality overrides.
    pub per_functionality: HashMap<Functionality, BucketConfig>,
    /// Node-wide ceiling across all functionalities; absent by default.
    pub node_bucket: Option<BucketConfig>,
}

impl ThrottleConfig {
    /// Bucket sizing for a functionality, falling back to the default.
    pub fn bucket_for(&self, functionality: Functionality) -> BucketConfig {
        self.per_functionality
            .get(&functionality)
            .copied()
            .unwrap_or(self.default_bucket)
    }
}

/// Complete configuration for the admission pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Upper bound on serialized transaction size.
    pub max_transaction_bytes: usize,
    /// Upper bound on memo length in bytes.
    pub max_memo_bytes: usize,
    /// How far in the past a valid-start may lie.
    pub past_window_ms: u64,
    /// How far in the future a valid-start may lie.
    pub future_window_ms: u64,
    /// Minimum declared valid-duration.
    pub min_valid_duration_ms: u64,
    /// Maximum declared valid-duration.
    pub max_valid_duration_ms: u64,
    /// Throttle table.
    pub throttle: ThrottleConfig,
    /// Lookback window for the recent-transaction cache.
    pub duplicate_window_ms: u64,
    /// Shard count for the in-flight map.
    pub in_flight_shards: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_transaction_bytes: 6 * 1024,
            max_memo_bytes: 100,
            past_window_ms: 10_000,
            future_window_ms: 5_000,
            min_valid_duration_ms: 15_000,
            max_valid_duration_ms: 180_000,
            throttle: ThrottleConfig::default(),
            duplicate_window_ms: 180_000,
            in_flight_shards: 16,
        }
    }
}
