//! Core request and entity types for the admission pipeline.
//!
//! Everything here is an immutable value: requests are parsed once by
//! the RPC adapter and never mutated inside the pipeline.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Identifier of a ledger entity (account, contract, or file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub fn new(realm: u64, num: u64) -> Self {
        Self { realm, num }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.realm, self.num)
    }
}

pub type AccountId = EntityId;
pub type ContractId = EntityId;
pub type FileId = EntityId;

/// Unique transaction identity: payer plus the declared valid-start.
///
/// Two submissions with the same id are the same transaction as far as
/// duplicate detection and in-flight tracking are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    pub payer: AccountId,
    pub valid_start: Timestamp,
}

/// Opaque signature bytes. Verification is delegated to the signature
/// collaborator; the pipeline never inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

/// Opaque public key material attached to an account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKey(pub Vec<u8>);

/// The closed set of operations the gateway routes.
///
/// Adding a tag here without registering a pipeline for it makes the
/// router answer `Unsupported` for that tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Functionality {
    // Transactions
    CryptoTransfer,
    ContractCreate,
    ContractCall,
    ContractUpdate,
    ContractDelete,
    FileCreate,
    FileUpdate,
    FileDelete,
    SystemDelete,
    SystemUndelete,
    // Queries
    GetAccountBalance,
    CryptoGetInfo,
    ContractCallLocal,
    ContractGetInfo,
    ContractGetBytecode,
    FileGetInfo,
    FileGetContents,
}

impl Functionality {
    /// True for tags that enter the transaction pipeline.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            Self::CryptoTransfer
                | Self::ContractCreate
                | Self::ContractCall
                | Self::ContractUpdate
                | Self::ContractDelete
                | Self::FileCreate
                | Self::FileUpdate
                | Self::FileDelete
                | Self::SystemDelete
                | Self::SystemUndelete
        )
    }

    /// True for tags that enter the query pipeline.
    pub fn is_query(&self) -> bool {
        !self.is_transaction()
    }

    /// All transaction tags, in routing order.
    pub const TRANSACTIONS: [Functionality; 10] = [
        Self::CryptoTransfer,
        Self::ContractCreate,
        Self::ContractCall,
        Self::ContractUpdate,
        Self::ContractDelete,
        Self::FileCreate,
        Self::FileUpdate,
        Self::FileDelete,
        Self::SystemDelete,
        Self::SystemUndelete,
    ];

    /// All query tags, in routing order.
    pub const QUERIES: [Functionality; 7] = [
        Self::GetAccountBalance,
        Self::CryptoGetInfo,
        Self::ContractCallLocal,
        Self::ContractGetInfo,
        Self::ContractGetBytecode,
        Self::FileGetInfo,
        Self::FileGetContents,
    ];
}

/// Parsed per-kind transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionBody {
    CryptoTransfer { transfers: Vec<(AccountId, i64)> },
    ContractCreate { bytecode: Vec<u8>, gas: u64 },
    ContractCall { contract: ContractId, gas: u64, params: Vec<u8> },
    ContractUpdate { contract: ContractId },
    ContractDelete { contract: ContractId },
    FileCreate { contents: Vec<u8> },
    FileUpdate { file: FileId, contents: Vec<u8> },
    FileDelete { file: FileId },
    SystemDelete { target: EntityId },
    SystemUndelete { target: EntityId },
}

impl TransactionBody {
    /// The functionality tag this body belongs to.
    pub fn functionality(&self) -> Functionality {
        match self {
            Self::CryptoTransfer { .. } => Functionality::CryptoTransfer,
            Self::ContractCreate { .. } => Functionality::ContractCreate,
            Self::ContractCall { .. } => Functionality::ContractCall,
            Self::ContractUpdate { .. } => Functionality::ContractUpdate,
            Self::ContractDelete { .. } => Functionality::ContractDelete,
            Self::FileCreate { .. } => Functionality::FileCreate,
            Self::FileUpdate { .. } => Functionality::FileUpdate,
            Self::FileDelete { .. } => Functionality::FileDelete,
            Self::SystemDelete { .. } => Functionality::SystemDelete,
            Self::SystemUndelete { .. } => Functionality::SystemUndelete,
        }
    }
}

/// A signed transaction as handed over by the RPC adapter.
///
/// The payer is `Option` because a structurally broken submission may
/// omit it; precheck proves presence before anything downstream runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingTransaction {
    pub functionality: Functionality,
    pub payer: Option<AccountId>,
    pub valid_start: Timestamp,
    pub valid_duration_ms: u64,
    pub max_fee: u64,
    pub signatures: Vec<Signature>,
    pub memo: String,
    pub body: TransactionBody,
    /// Serialized form, forwarded verbatim to the substrate.
    pub raw_bytes: Vec<u8>,
}

impl IncomingTransaction {
    /// Transaction identity, available once a payer is present.
    pub fn id(&self) -> Option<TransactionId> {
        self.payer.map(|payer| TransactionId {
            payer,
            valid_start: self.valid_start,
        })
    }

    /// Size inputs for the fee schedule.
    pub fn size_metrics(&self) -> SizeMetrics {
        SizeMetrics {
            body_bytes: self.raw_bytes.len(),
            signature_count: self.signatures.len(),
        }
    }
}

/// Whether a query asks only for its cost or for the actual answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Quote the fee; no payment required, no state read.
    CostAnswer,
    /// Execute against the snapshot; requires an attached payment.
    AnswerOnly,
}

/// Parsed per-kind query payload naming the target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryBody {
    GetAccountBalance { account: AccountId },
    CryptoGetInfo { account: AccountId },
    ContractCallLocal { contract: ContractId, gas: u64, params: Vec<u8> },
    ContractGetInfo { contract: ContractId },
    ContractGetBytecode { contract: ContractId },
    FileGetInfo { file: FileId },
    FileGetContents { file: FileId },
}

impl QueryBody {
    pub fn functionality(&self) -> Functionality {
        match self {
            Self::GetAccountBalance { .. } => Functionality::GetAccountBalance,
            Self::CryptoGetInfo { .. } => Functionality::CryptoGetInfo,
            Self::ContractCallLocal { .. } => Functionality::ContractCallLocal,
            Self::ContractGetInfo { .. } => Functionality::ContractGetInfo,
            Self::ContractGetBytecode { .. } => Functionality::ContractGetBytecode,
            Self::FileGetInfo { .. } => Functionality::FileGetInfo,
            Self::FileGetContents { .. } => Functionality::FileGetContents,
        }
    }
}

/// A read query as handed over by the RPC adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingQuery {
    pub functionality: Functionality,
    pub response_kind: ResponseKind,
    /// Payment transaction attached to `AnswerOnly` queries.
    pub payment: Option<IncomingTransaction>,
    pub body: QueryBody,
}

impl IncomingQuery {
    /// Sum of positive transfer amounts in the attached payment body.
    ///
    /// This is the amount the client offers for the answer; zero when
    /// no payment is attached or the payment is not a transfer.
    pub fn offered_payment(&self) -> u64 {
        match &self.payment {
            Some(txn) => match &txn.body {
                TransactionBody::CryptoTransfer { transfers } => transfers
                    .iter()
                    .filter(|(_, amount)| *amount > 0)
                    .map(|(_, amount)| *amount as u64)
                    .sum(),
                _ => 0,
            },
            None => 0,
        }
    }
}

/// Size inputs the fee schedule prices against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMetrics {
    pub body_bytes: usize,
    pub signature_count: usize,
}

// =============================================================================
// SNAPSHOT RECORDS
// =============================================================================

/// Account record as exposed by a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: u64,
    pub deleted: bool,
    pub expired: bool,
    pub key: AccountKey,
}

/// Contract record as exposed by a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub deleted: bool,
    pub bytecode: Vec<u8>,
    pub has_admin_key: bool,
}

/// File record as exposed by a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    pub deleted: bool,
    pub contents: Vec<u8>,
}
