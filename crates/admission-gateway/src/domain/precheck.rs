//! Stateless precheck: structural validation with no state access.
//!
//! Rejects garbage at the gate before it costs a throttle token or a
//! snapshot read. The check order is fixed and short-circuiting; the
//! first failing check names the response code.

use crate::domain::config::AdmissionConfig;
use crate::domain::response::ResponseCode;
use crate::domain::types::{IncomingQuery, IncomingTransaction, ResponseKind, Timestamp};
use tracing::debug;

/// Structural validator for transactions and queries.
#[derive(Debug, Clone)]
pub struct StatelessPrecheck {
    max_transaction_bytes: usize,
    max_memo_bytes: usize,
    past_window_ms: u64,
    future_window_ms: u64,
    min_valid_duration_ms: u64,
    max_valid_duration_ms: u64,
}

impl StatelessPrecheck {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            max_transaction_bytes: config.max_transaction_bytes,
            max_memo_bytes: config.max_memo_bytes,
            past_window_ms: config.past_window_ms,
            future_window_ms: config.future_window_ms,
            min_valid_duration_ms: config.min_valid_duration_ms,
            max_valid_duration_ms: config.max_valid_duration_ms,
        }
    }

    /// Structural checks for a transaction, in contract order:
    /// body, payer, size, valid-start window, duration bounds, memo.
    pub fn check_transaction(&self, txn: &IncomingTransaction, now: Timestamp) -> ResponseCode {
        if txn.raw_bytes.is_empty() || txn.body.functionality() != txn.functionality {
            debug!(functionality = ?txn.functionality, "precheck: malformed body");
            return ResponseCode::InvalidTransactionBody;
        }

        if txn.payer.is_none() {
            debug!(functionality = ?txn.functionality, "precheck: missing payer");
            return ResponseCode::InvalidTransactionBody;
        }

        if txn.raw_bytes.len() > self.max_transaction_bytes {
            debug!(
                size = txn.raw_bytes.len(),
                limit = self.max_transaction_bytes,
                "precheck: oversize transaction"
            );
            return ResponseCode::TransactionOversize;
        }

        let earliest = now.saturating_sub(self.past_window_ms);
        let latest = now.saturating_add(self.future_window_ms);
        if txn.valid_start < earliest || txn.valid_start > latest {
            debug!(
                valid_start = txn.valid_start,
                now, "precheck: valid-start outside window"
            );
            return ResponseCode::InvalidTransactionStart;
        }

        if txn.valid_duration_ms < self.min_valid_duration_ms
            || txn.valid_duration_ms > self.max_valid_duration_ms
        {
            debug!(
                duration_ms = txn.valid_duration_ms,
                "precheck: duration out of bounds"
            );
            return ResponseCode::InvalidTransactionDuration;
        }

        if txn.memo.len() > self.max_memo_bytes {
            debug!(memo_len = txn.memo.len(), "precheck: memo too long");
            return ResponseCode::MemoTooLong;
        }

        ResponseCode::Ok
    }

    /// Structural checks for a query: tag/body agreement, and an
    /// attached payment when the client wants an actual answer.
    pub fn check_query(&self, query: &IncomingQuery) -> ResponseCode {
        if query.body.functionality() != query.functionality {
            debug!(functionality = ?query.functionality, "precheck: query body mismatch");
            return ResponseCode::InvalidQueryBody;
        }

        if query.response_kind == ResponseKind::AnswerOnly && query.payment.is_none() {
            debug!(functionality = ?query.functionality, "precheck: missing query payment");
            return ResponseCode::MissingQueryPayment;
        }

        ResponseCode::Ok
    }
}
