//! Semantic validation: state-dependent checks against a snapshot.
//!
//! Runs after precheck and throttle. The check order is documented
//! contract: payer existence, deleted, expired, balance, fee adequacy,
//! signatures, duplicate window, then per-functionality rules.

use crate::domain::{
    CollaboratorError, Functionality, IncomingTransaction, RecentTransactionCache, ResponseCode,
    Timestamp, TransactionBody,
};
use crate::ports::{FeeSchedule, SignatureVerifier, StateSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of semantic validation: a code plus, on success, the
/// computed minimum fee. Never partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub code: ResponseCode,
    pub min_fee: u64,
}

impl ValidationOutcome {
    pub fn pass(min_fee: u64) -> Self {
        Self {
            code: ResponseCode::Ok,
            min_fee,
        }
    }

    pub fn fail(code: ResponseCode) -> Self {
        Self { code, min_fee: 0 }
    }

    pub fn is_pass(&self) -> bool {
        self.code == ResponseCode::Ok
    }
}

/// Per-functionality precondition check against the snapshot.
type EntityRule = fn(&TransactionBody, &dyn StateSnapshot) -> ResponseCode;

/// State-dependent validator for admitted transactions.
pub struct SemanticValidator {
    verifier: Arc<dyn SignatureVerifier>,
    fees: Arc<dyn FeeSchedule>,
    duplicates: Arc<RecentTransactionCache>,
    rules: HashMap<Functionality, EntityRule>,
}

impl SemanticValidator {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        fees: Arc<dyn FeeSchedule>,
        duplicates: Arc<RecentTransactionCache>,
    ) -> Self {
        Self {
            verifier,
            fees,
            duplicates,
            rules: build_rule_table(),
        }
    }

    /// Validate `txn` against `snapshot` in contract order, returning
    /// the first violation or the minimum fee on success.
    pub fn validate(
        &self,
        txn: &IncomingTransaction,
        snapshot: &dyn StateSnapshot,
        now: Timestamp,
    ) -> Result<ValidationOutcome, CollaboratorError> {
        // Precheck proved payer presence; a missing payer here is a
        // caller bug, answered as a structural failure.
        let Some(id) = txn.id() else {
            return Ok(ValidationOutcome::fail(ResponseCode::InvalidTransactionBody));
        };

        let Some(payer) = snapshot.account(&id.payer) else {
            debug!(payer = %id.payer, "semantic: unknown payer");
            return Ok(ValidationOutcome::fail(ResponseCode::InvalidAccountId));
        };

        if payer.deleted {
            return Ok(ValidationOutcome::fail(ResponseCode::AccountDeleted));
        }

        if payer.expired {
            return Ok(ValidationOutcome::fail(ResponseCode::AccountExpired));
        }

        if payer.balance < txn.max_fee {
            debug!(
                payer = %id.payer,
                balance = payer.balance,
                max_fee = txn.max_fee,
                "semantic: payer cannot cover declared fee"
            );
            return Ok(ValidationOutcome::fail(
                ResponseCode::InsufficientPayerBalance,
            ));
        }

        let min_fee = self.fees.fee(txn.functionality, txn.size_metrics())?;
        if txn.max_fee < min_fee {
            return Ok(ValidationOutcome::fail(ResponseCode::InsufficientTxFee));
        }

        if !self.verifier.verify(&txn.signatures, &payer.key)? {
            debug!(payer = %id.payer, "semantic: signature check failed");
            return Ok(ValidationOutcome::fail(ResponseCode::InvalidSignature));
        }

        if self.duplicates.observe(id, now) {
            return Ok(ValidationOutcome::fail(ResponseCode::DuplicateTransaction));
        }

        if let Some(rule) = self.rules.get(&txn.functionality) {
            let code = rule(&txn.body, snapshot);
            if code != ResponseCode::Ok {
                debug!(functionality = ?txn.functionality, code = ?code, "semantic: entity rule failed");
                return Ok(ValidationOutcome::fail(code));
            }
        }

        Ok(ValidationOutcome::pass(min_fee))
    }
}

// =============================================================================
// ENTITY RULES
// =============================================================================

fn build_rule_table() -> HashMap<Functionality, EntityRule> {
    let mut rules: HashMap<Functionality, EntityRule> = HashMap::new();
    rules.insert(Functionality::ContractCall, contract_target_live);
    rules.insert(Functionality::ContractUpdate, contract_target_live);
    rules.insert(Functionality::ContractDelete, contract_target_live);
    rules.insert(Functionality::FileUpdate, file_target_live);
    rules.insert(Functionality::FileDelete, file_target_live);
    rules.insert(Functionality::SystemDelete, system_target_live);
    rules.insert(Functionality::SystemUndelete, system_target_exists);
    rules
}

fn contract_target_live(body: &TransactionBody, snapshot: &dyn StateSnapshot) -> ResponseCode {
    let contract_id = match body {
        TransactionBody::ContractCall { contract, .. }
        | TransactionBody::ContractUpdate { contract }
        | TransactionBody::ContractDelete { contract } => contract,
        _ => return ResponseCode::InvalidTransactionBody,
    };

    match snapshot.contract(contract_id) {
        None => ResponseCode::InvalidContractId,
        Some(contract) if contract.deleted => ResponseCode::ContractDeleted,
        Some(_) => ResponseCode::Ok,
    }
}

fn file_target_live(body: &TransactionBody, snapshot: &dyn StateSnapshot) -> ResponseCode {
    let file_id = match body {
        TransactionBody::FileUpdate { file, .. } | TransactionBody::FileDelete { file } => file,
        _ => return ResponseCode::InvalidTransactionBody,
    };

    match snapshot.file(file_id) {
        None => ResponseCode::InvalidFileId,
        Some(file) if file.deleted => ResponseCode::FileDeleted,
        Some(_) => ResponseCode::Ok,
    }
}

/// System delete targets a live file or contract.
fn system_target_live(body: &TransactionBody, snapshot: &dyn StateSnapshot) -> ResponseCode {
    let TransactionBody::SystemDelete { target } = body else {
        return ResponseCode::InvalidTransactionBody;
    };

    if let Some(file) = snapshot.file(target) {
        return if file.deleted {
            ResponseCode::FileDeleted
        } else {
            ResponseCode::Ok
        };
    }
    if let Some(contract) = snapshot.contract(target) {
        return if contract.deleted {
            ResponseCode::ContractDeleted
        } else {
            ResponseCode::Ok
        };
    }
    ResponseCode::InvalidFileId
}

/// System undelete only needs the target to exist; deleted is the
/// expected state here.
fn system_target_exists(body: &TransactionBody, snapshot: &dyn StateSnapshot) -> ResponseCode {
    let TransactionBody::SystemUndelete { target } = body else {
        return ResponseCode::InvalidTransactionBody;
    };

    if snapshot.file(target).is_some() || snapshot.contract(target).is_some() {
        ResponseCode::Ok
    } else {
        ResponseCode::InvalidFileId
    }
}
