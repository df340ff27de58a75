//! Submission coordinator: exactly-once handoff to consensus.
//!
//! A sharded in-flight map guarantees that concurrent submissions of
//! the same transaction id reach the substrate at most once. Entries
//! live only between admission acceptance and substrate acknowledgment.

use crate::domain::{CollaboratorError, IncomingTransaction, ResponseCode, Timestamp, TransactionId};
use crate::ports::{AcceptVerdict, ConsensusSubstrate};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Sharded map of transactions currently being handed to consensus.
pub struct InFlightTable {
    shards: Vec<Mutex<HashMap<TransactionId, Timestamp>>>,
}

impl InFlightTable {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard_for(&self, id: &TransactionId) -> &Mutex<HashMap<TransactionId, Timestamp>> {
        let mut hasher = Sha256::new();
        hasher.update(id.payer.realm.to_le_bytes());
        hasher.update(id.payer.num.to_le_bytes());
        hasher.update(id.valid_start.to_le_bytes());
        let digest = hasher.finalize();
        // First 8 digest bytes pick the shard.
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(prefix) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Insert `id` unless already present. Returns false on conflict.
    pub fn try_insert(&self, id: TransactionId, now: Timestamp) -> bool {
        let mut shard = self.shard_for(&id).lock();
        match shard.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            }
        }
    }

    pub fn remove(&self, id: &TransactionId) {
        self.shard_for(id).lock().remove(id);
    }

    /// Total in-flight entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hands validated transactions to the consensus substrate.
pub struct SubmissionCoordinator {
    in_flight: InFlightTable,
    substrate: Arc<dyn ConsensusSubstrate>,
}

impl SubmissionCoordinator {
    pub fn new(shard_count: usize, substrate: Arc<dyn ConsensusSubstrate>) -> Self {
        Self {
            in_flight: InFlightTable::new(shard_count),
            substrate,
        }
    }

    /// Offer `txn` to the substrate exactly once per id.
    ///
    /// A concurrent in-flight submission of the same id answers
    /// `DuplicateTransaction` without touching the substrate. The
    /// in-flight entry is removed on every exit path, including
    /// substrate failure.
    pub async fn submit(
        &self,
        txn: &IncomingTransaction,
        id: TransactionId,
        now: Timestamp,
    ) -> Result<ResponseCode, CollaboratorError> {
        if !self.in_flight.try_insert(id, now) {
            debug!(payer = %id.payer, valid_start = id.valid_start, "submission: id already in flight");
            return Ok(ResponseCode::DuplicateTransaction);
        }

        let digest = Sha256::digest(&txn.raw_bytes);
        debug!(
            payer = %id.payer,
            tx_hash = %hex::encode(&digest[..8]),
            "submission: offering to substrate"
        );
        let result = self.substrate.accept(&txn.raw_bytes).await;
        self.in_flight.remove(&id);
        let verdict = result?;

        Ok(match verdict {
            AcceptVerdict::Accepted => ResponseCode::Ok,
            AcceptVerdict::Busy => ResponseCode::Busy,
            AcceptVerdict::NotActive => ResponseCode::PlatformNotActive,
        })
    }

    /// Current number of in-flight transactions.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}
