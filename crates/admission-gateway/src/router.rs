//! Functionality router: the gateway's composition point.
//!
//! Owns every pipeline stage, routes each request by its functionality
//! tag, and forms the error boundary: collaborator failures are logged
//! and downgraded to `FailInvalid`, never surfaced as errors.

use crate::domain::{
    AdmissionConfig, CollaboratorError, Functionality, IncomingQuery, IncomingTransaction,
    QueryOutcomes, QueryResponse, RecentTransactionCache, ResponseCode, StatelessPrecheck,
    ThrottleGate, TransactionOutcomes, TransactionResponse,
};
use crate::ports::{ConsensusSubstrate, FeeSchedule, SignatureVerifier, StateView, TimeSource};
use crate::service::{AnswerEngine, SemanticValidator, SubmissionCoordinator};
use std::sync::Arc;
use tracing::{error, info};

/// Outbound collaborators injected at construction.
pub struct GatewayDeps {
    pub state: Arc<dyn StateView>,
    pub substrate: Arc<dyn ConsensusSubstrate>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub fees: Arc<dyn FeeSchedule>,
    pub time: Arc<dyn TimeSource>,
}

/// The admission gateway: validates, throttles, and dispatches
/// transactions and queries. `Send + Sync`, no per-request state;
/// safe to share behind an `Arc` across request tasks.
pub struct AdmissionGateway {
    precheck: StatelessPrecheck,
    throttle: ThrottleGate,
    validator: SemanticValidator,
    coordinator: SubmissionCoordinator,
    answers: AnswerEngine,
    state: Arc<dyn StateView>,
    time: Arc<dyn TimeSource>,
}

impl AdmissionGateway {
    /// Build the full pipeline once from config and collaborators.
    pub fn new(config: AdmissionConfig, deps: GatewayDeps) -> Self {
        let now = deps.time.now();
        let duplicates = Arc::new(RecentTransactionCache::new(config.duplicate_window_ms));

        let gateway = Self {
            precheck: StatelessPrecheck::new(&config),
            throttle: ThrottleGate::new(&config.throttle, now),
            validator: SemanticValidator::new(
                Arc::clone(&deps.verifier),
                Arc::clone(&deps.fees),
                duplicates,
            ),
            coordinator: SubmissionCoordinator::new(config.in_flight_shards, deps.substrate),
            answers: AnswerEngine::new(deps.fees),
            state: deps.state,
            time: deps.time,
        };
        info!(
            shards = config.in_flight_shards,
            duplicate_window_ms = config.duplicate_window_ms,
            "admission gateway ready"
        );
        gateway
    }

    /// Submit a signed transaction for admission.
    ///
    /// Always returns an envelope; a query tag or a tag/transaction
    /// mismatch is answered without running any pipeline stage.
    pub async fn submit(
        &self,
        functionality: Functionality,
        txn: &IncomingTransaction,
    ) -> TransactionResponse {
        if !functionality.is_transaction() {
            return TransactionResponse::rejected(ResponseCode::Unsupported);
        }
        if functionality != txn.functionality {
            return TransactionResponse::rejected(ResponseCode::InvalidTransactionBody);
        }

        match self.submit_inner(txn).await {
            Ok(response) => response,
            Err(err) => {
                error!(functionality = ?functionality, error = %err, "collaborator failure during submit");
                TransactionResponse::rejected(ResponseCode::FailInvalid)
            }
        }
    }

    async fn submit_inner(
        &self,
        txn: &IncomingTransaction,
    ) -> Result<TransactionResponse, CollaboratorError> {
        let mut outcomes = TransactionOutcomes {
            structural: ResponseCode::Ok,
            throttle: ResponseCode::Ok,
            semantic: ResponseCode::Ok,
            submission: None,
        };
        let now = self.time.now();

        outcomes.structural = self.precheck.check_transaction(txn, now);
        if outcomes.structural != ResponseCode::Ok {
            return Ok(TransactionResponse::rejected(outcomes.resolve()));
        }

        if !self.throttle.try_admit(txn.functionality, now) {
            outcomes.throttle = ResponseCode::Busy;
            return Ok(TransactionResponse::rejected(outcomes.resolve()));
        }

        // Snapshot is fetched only after the throttle admits.
        let snapshot = self.state.latest_snapshot().await?;
        let validation = self.validator.validate(txn, snapshot.as_ref(), now)?;
        if !validation.is_pass() {
            outcomes.semantic = validation.code;
            return Ok(TransactionResponse::rejected(outcomes.resolve()));
        }

        // Validation passed, so the payer and therefore the id exist.
        let Some(id) = txn.id() else {
            return Ok(TransactionResponse::rejected(
                ResponseCode::InvalidTransactionBody,
            ));
        };

        outcomes.submission = Some(self.coordinator.submit(txn, id, now).await?);
        match outcomes.resolve() {
            ResponseCode::Ok => Ok(TransactionResponse::ok(validation.min_fee)),
            code => Ok(TransactionResponse::rejected(code)),
        }
    }

    /// Answer a read query.
    pub async fn answer(
        &self,
        functionality: Functionality,
        query: &IncomingQuery,
    ) -> QueryResponse {
        if !functionality.is_query() {
            return QueryResponse::rejected(ResponseCode::Unsupported);
        }
        if functionality != query.functionality {
            return QueryResponse::rejected(ResponseCode::InvalidQueryBody);
        }

        match self.answer_inner(query).await {
            Ok(response) => response,
            Err(err) => {
                error!(functionality = ?functionality, error = %err, "collaborator failure during answer");
                QueryResponse::rejected(ResponseCode::FailInvalid)
            }
        }
    }

    async fn answer_inner(
        &self,
        query: &IncomingQuery,
    ) -> Result<QueryResponse, CollaboratorError> {
        let outcomes = QueryOutcomes {
            structural: self.precheck.check_query(query),
            payment: ResponseCode::Ok,
            execution: ResponseCode::Ok,
        };
        if outcomes.resolve() != ResponseCode::Ok {
            return Ok(QueryResponse::rejected(outcomes.resolve()));
        }

        let snapshot = self.state.latest_snapshot().await?;
        self.answers.answer(query, snapshot.as_ref())
    }

    /// Number of transactions currently in flight to the substrate.
    pub fn in_flight_len(&self) -> usize {
        self.coordinator.in_flight_len()
    }
}
