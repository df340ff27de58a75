//! Outbound (driven) ports for the admission gateway.
//!
//! These traits define the collaborators the pipeline depends on:
//! state reads, consensus handoff, signature checks, fee pricing, and
//! time. All of them are injected at construction.

use crate::domain::{
    Account, AccountId, AccountKey, CollaboratorError, Contract, ContractId, FileId,
    Functionality, Signature, SizeMetrics, StoredFile, Timestamp,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Immutable view of replicated state at a single point in time.
///
/// Lookups are infallible apart from not-found; a snapshot that cannot
/// be read should not have been produced.
pub trait StateSnapshot: Send + Sync {
    fn account(&self, id: &AccountId) -> Option<Account>;
    fn contract(&self, id: &ContractId) -> Option<Contract>;
    fn file(&self, id: &FileId) -> Option<StoredFile>;
}

/// Supplier of state snapshots from the State View collaborator.
#[async_trait]
pub trait StateView: Send + Sync {
    /// The most recent committed snapshot.
    async fn latest_snapshot(&self) -> Result<Arc<dyn StateSnapshot>, CollaboratorError>;
}

/// Substrate verdict on a handed-off transaction.
///
/// `Accepted` means accepted into the consensus pipeline, not final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptVerdict {
    Accepted,
    Busy,
    NotActive,
}

/// Handoff point to the consensus collaborator.
#[async_trait]
pub trait ConsensusSubstrate: Send + Sync {
    /// Offer the serialized transaction to consensus.
    async fn accept(&self, raw: &[u8]) -> Result<AcceptVerdict, CollaboratorError>;
}

/// Signature verification collaborator.
///
/// `Ok(false)` is an invalid signature; `Err` is a service failure.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        signatures: &[Signature],
        required_key: &AccountKey,
    ) -> Result<bool, CollaboratorError>;
}

/// Fee schedule collaborator: prices an operation by its size metrics.
pub trait FeeSchedule: Send + Sync {
    fn fee(
        &self,
        functionality: Functionality,
        metrics: SizeMetrics,
    ) -> Result<u64, CollaboratorError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

// =============================================================================
// MOCKS
// =============================================================================

/// Mock snapshot backed by in-memory maps.
#[cfg(test)]
#[derive(Default)]
pub struct MockSnapshot {
    accounts: std::collections::HashMap<AccountId, Account>,
    contracts: std::collections::HashMap<ContractId, Contract>,
    files: std::collections::HashMap<FileId, StoredFile>,
}

#[cfg(test)]
impl MockSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.id, account);
        self
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        self.contracts.insert(contract.id, contract);
        self
    }

    pub fn with_file(mut self, file: StoredFile) -> Self {
        self.files.insert(file.id, file);
        self
    }
}

#[cfg(test)]
impl StateSnapshot for MockSnapshot {
    fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn contract(&self, id: &ContractId) -> Option<Contract> {
        self.contracts.get(id).cloned()
    }

    fn file(&self, id: &FileId) -> Option<StoredFile> {
        self.files.get(id).cloned()
    }
}

/// Mock state view serving a fixed snapshot.
#[cfg(test)]
pub struct MockStateView {
    snapshot: Arc<dyn StateSnapshot>,
}

#[cfg(test)]
impl MockStateView {
    pub fn new(snapshot: MockSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl StateView for MockStateView {
    async fn latest_snapshot(&self) -> Result<Arc<dyn StateSnapshot>, CollaboratorError> {
        Ok(Arc::clone(&self.snapshot))
    }
}

/// Mock substrate with a fixed verdict and a call counter.
#[cfg(test)]
pub struct MockSubstrate {
    verdict: AcceptVerdict,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSubstrate {
    pub fn new(verdict: AcceptVerdict) -> Self {
        Self {
            verdict,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl ConsensusSubstrate for MockSubstrate {
    async fn accept(&self, _raw: &[u8]) -> Result<AcceptVerdict, CollaboratorError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.verdict)
    }
}

/// Mock verifier with a fixed verdict.
#[cfg(test)]
pub struct MockVerifier {
    valid: bool,
}

#[cfg(test)]
impl MockVerifier {
    pub fn accepting() -> Self {
        Self { valid: true }
    }

    pub fn rejecting() -> Self {
        Self { valid: false }
    }
}

#[cfg(test)]
impl SignatureVerifier for MockVerifier {
    fn verify(
        &self,
        _signatures: &[Signature],
        _required_key: &AccountKey,
    ) -> Result<bool, CollaboratorError> {
        Ok(self.valid)
    }
}

/// Mock fee schedule charging a flat fee per operation.
#[cfg(test)]
pub struct MockFeeSchedule {
    flat_fee: u64,
}

#[cfg(test)]
impl MockFeeSchedule {
    pub fn flat(fee: u64) -> Self {
        Self { flat_fee: fee }
    }
}

#[cfg(test)]
impl FeeSchedule for MockFeeSchedule {
    fn fee(
        &self,
        _functionality: Functionality,
        _metrics: SizeMetrics,
    ) -> Result<u64, CollaboratorError> {
        Ok(self.flat_fee)
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}
