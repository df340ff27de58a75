//! Response codes, wire envelopes, and the outcome-to-code mapping.
//!
//! Codes are a stable contract with clients. Rejections are data, not
//! errors; the only code a client cannot act on is `FailInvalid`.

use crate::domain::types::{AccountId, ContractId, FileId};
use serde::{Deserialize, Serialize};

/// Precheck and admission response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Ok,
    // Structural
    InvalidTransactionBody,
    InvalidTransactionStart,
    InvalidTransactionDuration,
    TransactionOversize,
    MemoTooLong,
    InvalidQueryBody,
    MissingQueryPayment,
    // Capacity
    Busy,
    PlatformNotActive,
    // Semantic
    InsufficientPayerBalance,
    InsufficientTxFee,
    InvalidSignature,
    DuplicateTransaction,
    InvalidAccountId,
    AccountDeleted,
    AccountExpired,
    InvalidContractId,
    ContractDeleted,
    InvalidFileId,
    FileDeleted,
    // Routing
    Unsupported,
    // Internal failure, safe to surface
    FailInvalid,
}

impl ResponseCode {
    /// Capacity codes: the same request may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::PlatformNotActive)
    }
}

/// Envelope returned for every transaction submission.
///
/// `estimated_fee` is populated only on `Ok`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub code: ResponseCode,
    pub estimated_fee: Option<u64>,
}

impl TransactionResponse {
    pub fn ok(estimated_fee: u64) -> Self {
        Self {
            code: ResponseCode::Ok,
            estimated_fee: Some(estimated_fee),
        }
    }

    pub fn rejected(code: ResponseCode) -> Self {
        Self {
            code,
            estimated_fee: None,
        }
    }
}

/// Per-kind answer payload for read queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerPayload {
    AccountBalance {
        account: AccountId,
        balance: u64,
    },
    AccountInfo {
        account: AccountId,
        balance: u64,
        deleted: bool,
        expired: bool,
    },
    ContractInfo {
        contract: ContractId,
        deleted: bool,
        bytecode_size: usize,
        has_admin_key: bool,
    },
    ContractBytecode {
        contract: ContractId,
        bytecode: Vec<u8>,
    },
    ContractCallResult {
        contract: ContractId,
        output: Vec<u8>,
        gas_used: u64,
    },
    FileInfo {
        file: FileId,
        deleted: bool,
        size: usize,
    },
    FileContents {
        file: FileId,
        contents: Vec<u8>,
    },
}

/// Envelope returned for every query.
///
/// `cost` is the quoted fee; `answer` is present only for a successful
/// `AnswerOnly` execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub code: ResponseCode,
    pub cost: u64,
    pub answer: Option<AnswerPayload>,
}

impl QueryResponse {
    /// Successful `CostAnswer`: the quote alone.
    pub fn cost_only(cost: u64) -> Self {
        Self {
            code: ResponseCode::Ok,
            cost,
            answer: None,
        }
    }

    /// Successful `AnswerOnly`: quote plus payload.
    pub fn answered(cost: u64, answer: AnswerPayload) -> Self {
        Self {
            code: ResponseCode::Ok,
            cost,
            answer: Some(answer),
        }
    }

    pub fn rejected(code: ResponseCode) -> Self {
        Self {
            code,
            cost: 0,
            answer: None,
        }
    }
}

// =============================================================================
// OUTCOME RESOLUTION
// =============================================================================

/// Stage outcomes of one transaction submission.
///
/// A stage that never ran stays at `Ok` (or `None` for submission);
/// resolution picks the first failure in pipeline order, so the
/// ordering structural > throttle > semantic > submission is fixed
/// regardless of how the outcomes were gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcomes {
    pub structural: ResponseCode,
    pub throttle: ResponseCode,
    pub semantic: ResponseCode,
    pub submission: Option<ResponseCode>,
}

impl TransactionOutcomes {
    pub fn resolve(&self) -> ResponseCode {
        for code in [self.structural, self.throttle, self.semantic] {
            if code != ResponseCode::Ok {
                return code;
            }
        }
        self.submission.unwrap_or(ResponseCode::Ok)
    }
}

/// Stage outcomes of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutcomes {
    pub structural: ResponseCode,
    pub payment: ResponseCode,
    pub execution: ResponseCode,
}

impl QueryOutcomes {
    pub fn resolve(&self) -> ResponseCode {
        for code in [self.structural, self.payment, self.execution] {
            if code != ResponseCode::Ok {
                return code;
            }
        }
        ResponseCode::Ok
    }
}
