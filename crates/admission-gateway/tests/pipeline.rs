//! End-to-end tests of the admission pipeline.
//!
//! Collaborators are mocked with call counters so the tests can assert
//! not just the response code but which stages actually ran.

use admission_gateway::ports::{
    AcceptVerdict, ConsensusSubstrate, FeeSchedule, SignatureVerifier, StateSnapshot, StateView,
    TimeSource,
};
use admission_gateway::{
    Account, AccountKey, AdmissionConfig, AdmissionGateway, BucketConfig, CollaboratorError,
    Contract, EntityId, Functionality, GatewayDeps, IncomingQuery, IncomingTransaction, QueryBody,
    ResponseCode, ResponseKind, Signature, SizeMetrics, StoredFile, ThrottleConfig,
    TransactionBody,
};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

const NOW: u64 = 1_700_000_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// COUNTING MOCKS
// =============================================================================

#[derive(Default)]
struct FixtureSnapshot {
    accounts: HashMap<EntityId, Account>,
    contracts: HashMap<EntityId, Contract>,
    files: HashMap<EntityId, StoredFile>,
}

impl StateSnapshot for FixtureSnapshot {
    fn account(&self, id: &EntityId) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn contract(&self, id: &EntityId) -> Option<Contract> {
        self.contracts.get(id).cloned()
    }

    fn file(&self, id: &EntityId) -> Option<StoredFile> {
        self.files.get(id).cloned()
    }
}

struct CountingStateView {
    snapshot: Arc<FixtureSnapshot>,
    calls: AtomicUsize,
}

impl CountingStateView {
    fn new(snapshot: FixtureSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateView for CountingStateView {
    async fn latest_snapshot(&self) -> Result<Arc<dyn StateSnapshot>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.clone() as Arc<dyn StateSnapshot>)
    }
}

struct CountingSubstrate {
    verdict: AcceptVerdict,
    calls: AtomicUsize,
}

impl CountingSubstrate {
    fn new(verdict: AcceptVerdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsensusSubstrate for CountingSubstrate {
    async fn accept(&self, _raw: &[u8]) -> Result<AcceptVerdict, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so a concurrent duplicate has a chance to race.
        tokio::task::yield_now().await;
        Ok(self.verdict)
    }
}

struct CountingVerifier {
    valid: bool,
    calls: AtomicUsize,
}

impl CountingVerifier {
    fn accepting() -> Self {
        Self {
            valid: true,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignatureVerifier for CountingVerifier {
    fn verify(
        &self,
        _signatures: &[Signature],
        _required_key: &AccountKey,
    ) -> Result<bool, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.valid)
    }
}

struct FlatFees {
    fee: u64,
}

impl FeeSchedule for FlatFees {
    fn fee(
        &self,
        _functionality: Functionality,
        _metrics: SizeMetrics,
    ) -> Result<u64, CollaboratorError> {
        Ok(self.fee)
    }
}

struct FixedTime {
    now: AtomicU64,
}

impl FixedTime {
    fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

const PAYER: EntityId = EntityId { realm: 0, num: 2 };
const CONTRACT: EntityId = EntityId { realm: 0, num: 900 };
const FILE: EntityId = EntityId { realm: 0, num: 400 };

fn fixture_snapshot(payer_balance: u64) -> FixtureSnapshot {
    let mut snapshot = FixtureSnapshot::default();
    snapshot.accounts.insert(
        PAYER,
        Account {
            id: PAYER,
            balance: payer_balance,
            deleted: false,
            expired: false,
            key: AccountKey(vec![0xAA]),
        },
    );
    snapshot.contracts.insert(
        CONTRACT,
        Contract {
            id: CONTRACT,
            deleted: false,
            bytecode: vec![0x60, 0x0A],
            has_admin_key: true,
        },
    );
    snapshot.files.insert(
        FILE,
        StoredFile {
            id: FILE,
            deleted: false,
            contents: vec![7; 16],
        },
    );
    snapshot
}

struct Harness {
    gateway: AdmissionGateway,
    state: Arc<CountingStateView>,
    substrate: Arc<CountingSubstrate>,
    verifier: Arc<CountingVerifier>,
}

fn harness_with(config: AdmissionConfig, snapshot: FixtureSnapshot) -> Harness {
    let state = Arc::new(CountingStateView::new(snapshot));
    let substrate = Arc::new(CountingSubstrate::new(AcceptVerdict::Accepted));
    let verifier = Arc::new(CountingVerifier::accepting());

    let gateway = AdmissionGateway::new(
        config,
        GatewayDeps {
            state: state.clone(),
            substrate: substrate.clone(),
            verifier: verifier.clone(),
            fees: Arc::new(FlatFees { fee: 40 }),
            time: Arc::new(FixedTime::new(NOW)),
        },
    );

    Harness {
        gateway,
        state,
        substrate,
        verifier,
    }
}

fn harness() -> Harness {
    harness_with(AdmissionConfig::default(), fixture_snapshot(10_000))
}

fn transfer_txn(valid_start: u64) -> IncomingTransaction {
    IncomingTransaction {
        functionality: Functionality::CryptoTransfer,
        payer: Some(PAYER),
        valid_start,
        valid_duration_ms: 120_000,
        max_fee: 100,
        signatures: vec![Signature(vec![1, 2, 3])],
        memo: String::new(),
        body: TransactionBody::CryptoTransfer {
            transfers: vec![(PAYER, -10), (EntityId::new(0, 3), 10)],
        },
        raw_bytes: vec![0u8; 128],
    }
}

fn contract_call_txn(max_fee: u64) -> IncomingTransaction {
    IncomingTransaction {
        functionality: Functionality::ContractCall,
        payer: Some(PAYER),
        valid_start: NOW,
        valid_duration_ms: 120_000,
        max_fee,
        signatures: vec![Signature(vec![1, 2, 3])],
        memo: String::new(),
        body: TransactionBody::ContractCall {
            contract: CONTRACT,
            gas: 50_000,
            params: vec![0xFE],
        },
        raw_bytes: vec![0u8; 256],
    }
}

fn payment_txn(amount: i64) -> IncomingTransaction {
    IncomingTransaction {
        functionality: Functionality::CryptoTransfer,
        payer: Some(PAYER),
        valid_start: NOW,
        valid_duration_ms: 120_000,
        max_fee: 100,
        signatures: vec![Signature(vec![1])],
        memo: String::new(),
        body: TransactionBody::CryptoTransfer {
            transfers: vec![(PAYER, -amount), (EntityId::new(0, 3), amount)],
        },
        raw_bytes: vec![0u8; 64],
    }
}

// =============================================================================
// TRANSACTION PIPELINE
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn missing_payer_short_circuits_before_any_collaborator() {
    init_tracing();
    let harness = harness();
    let mut txn = transfer_txn(NOW);
    txn.payer = None;

    let response = harness
        .gateway
        .submit(Functionality::CryptoTransfer, &txn)
        .await;

    assert_eq!(response.code, ResponseCode::InvalidTransactionBody);
    assert_eq!(harness.state.calls(), 0);
    assert_eq!(harness.verifier.calls(), 0);
    assert_eq!(harness.substrate.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn capacity_bucket_admits_n_then_busy() {
    init_tracing();
    let mut config = AdmissionConfig::default();
    config.throttle = ThrottleConfig {
        default_bucket: BucketConfig {
            capacity: 3.0,
            refill_per_sec: 0.0,
        },
        per_functionality: HashMap::new(),
        node_bucket: None,
    };
    let harness = harness_with(config, fixture_snapshot(10_000));

    for i in 0..3 {
        let response = harness
            .gateway
            .submit(Functionality::CryptoTransfer, &transfer_txn(NOW + i))
            .await;
        assert_eq!(response.code, ResponseCode::Ok, "submission {i} admitted");
    }

    let response = harness
        .gateway
        .submit(Functionality::CryptoTransfer, &transfer_txn(NOW + 3))
        .await;
    assert_eq!(response.code, ResponseCode::Busy);
    // The throttled submission never reached the snapshot or substrate.
    assert_eq!(harness.state.calls(), 3);
    assert_eq!(harness.substrate.calls(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_same_id_submissions_reach_substrate_once() {
    init_tracing();
    let harness = Arc::new(harness());
    let txn = transfer_txn(NOW);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let harness = harness.clone();
        let txn = txn.clone();
        handles.push(tokio::spawn(async move {
            harness
                .gateway
                .submit(Functionality::CryptoTransfer, &txn)
                .await
        }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(handle.await.expect("task completes").code);
    }

    assert_eq!(harness.substrate.calls(), 1);
    assert!(codes.contains(&ResponseCode::Ok));
    assert!(codes.contains(&ResponseCode::DuplicateTransaction));
}

#[tokio::test(flavor = "multi_thread")]
async fn resubmission_within_window_is_duplicate() {
    let harness = harness();
    let txn = transfer_txn(NOW);

    let first = harness
        .gateway
        .submit(Functionality::CryptoTransfer, &txn)
        .await;
    assert_eq!(first.code, ResponseCode::Ok);

    let second = harness
        .gateway
        .submit(Functionality::CryptoTransfer, &txn)
        .await;
    assert_eq!(second.code, ResponseCode::DuplicateTransaction);
    assert_eq!(harness.substrate.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn broke_payer_never_reaches_substrate() {
    init_tracing();
    let harness = harness_with(AdmissionConfig::default(), fixture_snapshot(50));

    let response = harness
        .gateway
        .submit(Functionality::ContractCall, &contract_call_txn(100))
        .await;

    assert_eq!(response.code, ResponseCode::InsufficientPayerBalance);
    assert_eq!(harness.substrate.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn accepted_submission_reports_estimated_fee() {
    let harness = harness();

    let response = harness
        .gateway
        .submit(Functionality::ContractCall, &contract_call_txn(100))
        .await;

    assert_eq!(response.code, ResponseCode::Ok);
    assert_eq!(response.estimated_fee, Some(40));
    assert_eq!(harness.gateway.in_flight_len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn distinct_random_ids_all_admitted() {
    let harness = Arc::new(harness());
    let mut rng = rand::thread_rng();

    let mut handles = Vec::new();
    for _ in 0..32 {
        // Distinct valid-starts give distinct transaction ids.
        let offset: u64 = rng.gen_range(0..4_000);
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            harness
                .gateway
                .submit(Functionality::CryptoTransfer, &transfer_txn(NOW + offset))
                .await
                .code
        }));
    }

    let mut ok = 0;
    for handle in handles {
        let code = handle.await.expect("task completes");
        // Colliding random offsets legitimately report duplicates.
        assert!(
            code == ResponseCode::Ok || code == ResponseCode::DuplicateTransaction,
            "unexpected code {code:?}"
        );
        if code == ResponseCode::Ok {
            ok += 1;
        }
    }

    assert!(ok > 0);
    assert_eq!(harness.substrate.calls(), ok);
    assert_eq!(harness.gateway.in_flight_len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn determinism_same_request_same_snapshot_same_code() {
    // Two identical gateways fed the same request answer the same code.
    for _ in 0..3 {
        let harness = harness_with(AdmissionConfig::default(), fixture_snapshot(50));
        let response = harness
            .gateway
            .submit(Functionality::ContractCall, &contract_call_txn(100))
            .await;
        assert_eq!(response.code, ResponseCode::InsufficientPayerBalance);
    }
}

// =============================================================================
// QUERY PIPELINE
// =============================================================================

fn deleted_contract_snapshot() -> FixtureSnapshot {
    let mut snapshot = fixture_snapshot(10_000);
    snapshot.contracts.insert(
        CONTRACT,
        Contract {
            id: CONTRACT,
            deleted: true,
            bytecode: vec![],
            has_admin_key: false,
        },
    );
    snapshot
}

#[tokio::test(flavor = "multi_thread")]
async fn cost_answer_on_deleted_contract_still_quotes() {
    init_tracing();
    let harness = harness_with(AdmissionConfig::default(), deleted_contract_snapshot());
    let query = IncomingQuery {
        functionality: Functionality::ContractGetInfo,
        response_kind: ResponseKind::CostAnswer,
        payment: None,
        body: QueryBody::ContractGetInfo { contract: CONTRACT },
    };

    let response = harness
        .gateway
        .answer(Functionality::ContractGetInfo, &query)
        .await;

    assert_eq!(response.code, ResponseCode::Ok);
    assert_eq!(response.cost, 40);
    assert!(response.answer.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn answer_only_on_deleted_contract_reports_deletion() {
    let harness = harness_with(AdmissionConfig::default(), deleted_contract_snapshot());
    let query = IncomingQuery {
        functionality: Functionality::ContractGetInfo,
        response_kind: ResponseKind::AnswerOnly,
        payment: Some(payment_txn(40)),
        body: QueryBody::ContractGetInfo { contract: CONTRACT },
    };

    let response = harness
        .gateway
        .answer(Functionality::ContractGetInfo, &query)
        .await;

    assert_eq!(response.code, ResponseCode::ContractDeleted);
    assert!(response.answer.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn covered_contract_get_info_returns_payload() {
    let harness = harness();
    let query = IncomingQuery {
        functionality: Functionality::ContractGetInfo,
        response_kind: ResponseKind::AnswerOnly,
        payment: Some(payment_txn(40)),
        body: QueryBody::ContractGetInfo { contract: CONTRACT },
    };

    let response = harness
        .gateway
        .answer(Functionality::ContractGetInfo, &query)
        .await;

    assert_eq!(response.code, ResponseCode::Ok);
    assert_eq!(response.cost, 40);
    match response.answer {
        Some(admission_gateway::AnswerPayload::ContractInfo {
            contract,
            deleted,
            bytecode_size,
            has_admin_key,
        }) => {
            assert_eq!(contract, CONTRACT);
            assert!(!deleted);
            assert_eq!(bytecode_size, 2);
            assert!(has_admin_key);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn answer_only_without_payment_rejected_before_state_read() {
    let harness = harness();
    let query = IncomingQuery {
        functionality: Functionality::FileGetContents,
        response_kind: ResponseKind::AnswerOnly,
        payment: None,
        body: QueryBody::FileGetContents { file: FILE },
    };

    let response = harness
        .gateway
        .answer(Functionality::FileGetContents, &query)
        .await;

    assert_eq!(response.code, ResponseCode::MissingQueryPayment);
    assert_eq!(harness.state.calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn underpaid_answer_only_rejected() {
    let harness = harness();
    let query = IncomingQuery {
        functionality: Functionality::FileGetContents,
        response_kind: ResponseKind::AnswerOnly,
        payment: Some(payment_txn(39)),
        body: QueryBody::FileGetContents { file: FILE },
    };

    let response = harness
        .gateway
        .answer(Functionality::FileGetContents, &query)
        .await;

    assert_eq!(response.code, ResponseCode::InsufficientTxFee);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_contents_round_trip() {
    let harness = harness();
    let query = IncomingQuery {
        functionality: Functionality::FileGetContents,
        response_kind: ResponseKind::AnswerOnly,
        payment: Some(payment_txn(40)),
        body: QueryBody::FileGetContents { file: FILE },
    };

    let response = harness
        .gateway
        .answer(Functionality::FileGetContents, &query)
        .await;

    assert_eq!(response.code, ResponseCode::Ok);
    assert_eq!(
        response.answer,
        Some(admission_gateway::AnswerPayload::FileContents {
            file: FILE,
            contents: vec![7; 16],
        })
    );
}
