//! Recent-transaction cache for advisory duplicate detection.
//!
//! Tracks transaction ids seen within a rolling lookback window. The
//! check is advisory: final duplicate resolution happens at consensus,
//! this cache only saves the substrate from obvious resubmissions.

use crate::domain::types::{Timestamp, TransactionId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// How many observes between opportunistic eviction sweeps.
const EVICT_EVERY: u64 = 1024;

/// Time-evicted map of recently seen transaction ids.
pub struct RecentTransactionCache {
    seen: DashMap<TransactionId, Timestamp>,
    window_ms: u64,
    observe_count: AtomicU64,
}

impl RecentTransactionCache {
    pub fn new(window_ms: u64) -> Self {
        Self {
            seen: DashMap::new(),
            window_ms,
            observe_count: AtomicU64::new(0),
        }
    }

    /// Record `id` at `now`. Returns true if the id was already seen
    /// within the window (a duplicate).
    ///
    /// An entry older than the window is treated as unseen and its
    /// timestamp reset. Every `EVICT_EVERY` observes a full sweep
    /// drops expired entries to bound memory.
    pub fn observe(&self, id: TransactionId, now: Timestamp) -> bool {
        let count = self.observe_count.fetch_add(1, Ordering::Relaxed);
        if count % EVICT_EVERY == EVICT_EVERY - 1 {
            self.evict_expired(now);
        }

        let mut duplicate = false;
        self.seen
            .entry(id)
            .and_modify(|first_seen| {
                if now.saturating_sub(*first_seen) <= self.window_ms {
                    duplicate = true;
                } else {
                    *first_seen = now;
                }
            })
            .or_insert(now);
        duplicate
    }

    /// Drop every entry older than the lookback window.
    pub fn evict_expired(&self, now: Timestamp) {
        self.seen
            .retain(|_, first_seen| now.saturating_sub(*first_seen) <= self.window_ms);
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
