//! Answer engine: executes read queries against a state snapshot.
//!
//! Each query functionality is bound at startup to a handler with two
//! strategies: `quote_fee` prices the answer, `execute` produces it.
//! `CostAnswer` runs only the quote; `AnswerOnly` checks the attached
//! payment against the quote and then executes.

use crate::domain::{
    AnswerPayload, CollaboratorError, Functionality, IncomingQuery, QueryBody, QueryResponse,
    ResponseCode, ResponseKind, SizeMetrics,
};
use crate::ports::{FeeSchedule, StateSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Either the answer payload or the specific failure code.
pub type AnswerOutcome = Result<AnswerPayload, ResponseCode>;

/// Per-functionality strategies, bound once at startup.
struct QueryHandler {
    quote_fee: fn(&IncomingQuery, &dyn FeeSchedule) -> Result<u64, CollaboratorError>,
    execute: fn(&IncomingQuery, &dyn StateSnapshot) -> AnswerOutcome,
}

/// Dispatches read queries to their handlers.
pub struct AnswerEngine {
    handlers: HashMap<Functionality, QueryHandler>,
    fees: Arc<dyn FeeSchedule>,
}

impl AnswerEngine {
    pub fn new(fees: Arc<dyn FeeSchedule>) -> Self {
        Self {
            handlers: build_handler_table(),
            fees,
        }
    }

    /// Answer `query` against `snapshot`.
    ///
    /// The quote always succeeds for a registered functionality, even
    /// when the target entity is deleted or missing; only `AnswerOnly`
    /// execution reports entity failures.
    pub fn answer(
        &self,
        query: &IncomingQuery,
        snapshot: &dyn StateSnapshot,
    ) -> Result<QueryResponse, CollaboratorError> {
        let Some(handler) = self.handlers.get(&query.functionality) else {
            return Ok(QueryResponse::rejected(ResponseCode::Unsupported));
        };

        let cost = (handler.quote_fee)(query, self.fees.as_ref())?;

        match query.response_kind {
            ResponseKind::CostAnswer => Ok(QueryResponse::cost_only(cost)),
            ResponseKind::AnswerOnly => {
                if query.offered_payment() < cost {
                    debug!(
                        functionality = ?query.functionality,
                        offered = query.offered_payment(),
                        cost,
                        "answer: payment does not cover quote"
                    );
                    return Ok(QueryResponse::rejected(ResponseCode::InsufficientTxFee));
                }

                match (handler.execute)(query, snapshot) {
                    Ok(payload) => Ok(QueryResponse::answered(cost, payload)),
                    Err(code) => Ok(QueryResponse::rejected(code)),
                }
            }
        }
    }
}

// =============================================================================
// HANDLER TABLE
// =============================================================================

fn build_handler_table() -> HashMap<Functionality, QueryHandler> {
    let mut handlers = HashMap::new();
    handlers.insert(
        Functionality::GetAccountBalance,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_account_balance,
        },
    );
    handlers.insert(
        Functionality::CryptoGetInfo,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_account_info,
        },
    );
    handlers.insert(
        Functionality::ContractCallLocal,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_contract_call_local,
        },
    );
    handlers.insert(
        Functionality::ContractGetInfo,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_contract_info,
        },
    );
    handlers.insert(
        Functionality::ContractGetBytecode,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_contract_bytecode,
        },
    );
    handlers.insert(
        Functionality::FileGetInfo,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_file_info,
        },
    );
    handlers.insert(
        Functionality::FileGetContents,
        QueryHandler {
            quote_fee: quote_by_size,
            execute: execute_file_contents,
        },
    );
    handlers
}

/// Size inputs the fee schedule prices a query against.
fn query_metrics(query: &IncomingQuery) -> SizeMetrics {
    let body_bytes = match &query.body {
        QueryBody::ContractCallLocal { params, .. } => 48 + params.len(),
        _ => 32,
    };
    SizeMetrics {
        body_bytes,
        signature_count: 0,
    }
}

fn quote_by_size(
    query: &IncomingQuery,
    fees: &dyn FeeSchedule,
) -> Result<u64, CollaboratorError> {
    fees.fee(query.functionality, query_metrics(query))
}

fn execute_account_balance(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::GetAccountBalance { account } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot
        .account(account)
        .ok_or(ResponseCode::InvalidAccountId)?;
    if record.deleted {
        return Err(ResponseCode::AccountDeleted);
    }
    Ok(AnswerPayload::AccountBalance {
        account: *account,
        balance: record.balance,
    })
}

fn execute_account_info(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::CryptoGetInfo { account } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot
        .account(account)
        .ok_or(ResponseCode::InvalidAccountId)?;
    if record.deleted {
        return Err(ResponseCode::AccountDeleted);
    }
    Ok(AnswerPayload::AccountInfo {
        account: *account,
        balance: record.balance,
        deleted: record.deleted,
        expired: record.expired,
    })
}

fn execute_contract_call_local(
    query: &IncomingQuery,
    snapshot: &dyn StateSnapshot,
) -> AnswerOutcome {
    let QueryBody::ContractCallLocal { contract, .. } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot
        .contract(contract)
        .ok_or(ResponseCode::InvalidContractId)?;
    if record.deleted {
        return Err(ResponseCode::ContractDeleted);
    }
    // No execution engine behind this port; the local call answers
    // with an empty output against the stored bytecode.
    Ok(AnswerPayload::ContractCallResult {
        contract: *contract,
        output: Vec::new(),
        gas_used: 0,
    })
}

fn execute_contract_info(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::ContractGetInfo { contract } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot
        .contract(contract)
        .ok_or(ResponseCode::InvalidContractId)?;
    if record.deleted {
        return Err(ResponseCode::ContractDeleted);
    }
    Ok(AnswerPayload::ContractInfo {
        contract: *contract,
        deleted: record.deleted,
        bytecode_size: record.bytecode.len(),
        has_admin_key: record.has_admin_key,
    })
}

fn execute_contract_bytecode(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::ContractGetBytecode { contract } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot
        .contract(contract)
        .ok_or(ResponseCode::InvalidContractId)?;
    if record.deleted {
        return Err(ResponseCode::ContractDeleted);
    }
    Ok(AnswerPayload::ContractBytecode {
        contract: *contract,
        bytecode: record.bytecode,
    })
}

fn execute_file_info(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::FileGetInfo { file } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot.file(file).ok_or(ResponseCode::InvalidFileId)?;
    if record.deleted {
        return Err(ResponseCode::FileDeleted);
    }
    Ok(AnswerPayload::FileInfo {
        file: *file,
        deleted: record.deleted,
        size: record.contents.len(),
    })
}

fn execute_file_contents(query: &IncomingQuery, snapshot: &dyn StateSnapshot) -> AnswerOutcome {
    let QueryBody::FileGetContents { file } = &query.body else {
        return Err(ResponseCode::InvalidQueryBody);
    };

    let record = snapshot.file(file).ok_or(ResponseCode::InvalidFileId)?;
    if record.deleted {
        return Err(ResponseCode::FileDeleted);
    }
    Ok(AnswerPayload::FileContents {
        file: *file,
        contents: record.contents,
    })
}
