//! End-to-end tests of the bridge against the simulated ledgers.
//!
//! These drive full transfers through admission, both ledger legs and
//! reconciliation: the happy path in both directions, risk rejection,
//! halting on a lost second leg, idempotent replays, cancellation, recovery
//! after a restart, and concurrent transfers sharing one source account.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use openbridge_gate::AuditLog;
use openbridge_relay::{
    AdapterResult, BalanceMonitor, Collaborators, FaultPlan, JsonFileRecordStore, Keyring,
    LedgerAdapter, MemoryRecordStore, MemorySink, RecordStore, SimulatedBridge, SimulatedLedger,
    TransferOrchestrator,
};
use openbridge_types::{
    AccountId, AccountState, AdapterError, BridgeConfig, BridgeError, BridgeEvent, Direction,
    LedgerId, RequestId, RiskWeights, SignedTransfer, TransferRecord, TransferRequest,
    TransferStatus, TxRef,
};
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn id(raw: &str) -> RequestId {
    RequestId::parse(raw).unwrap()
}

/// Orchestrator wired to simulated ledgers, with network load as the only
/// risk factor so scores are easy to steer.
struct Rig {
    orchestrator: Arc<TransferOrchestrator>,
    ledger: Arc<SimulatedLedger>,
    bridge: Arc<SimulatedBridge>,
    store: Arc<dyn RecordStore>,
    events: Arc<MemorySink>,
    alice: AccountId,
    custody: AccountId,
}

fn config() -> BridgeConfig {
    let mut config = BridgeConfig {
        custody_account: Keyring::dev_account("custody"),
        ..BridgeConfig::default()
    };
    config.risk.weights = RiskWeights {
        amount: Decimal::ZERO,
        network_load: Decimal::ONE,
        history: Decimal::ZERO,
    };
    config.retry.max_attempts = 3;
    config.retry.backoff_base_ms = 1;
    config.retry.max_backoff_ms = 4;
    config.retry.call_timeout_ms = 1_000;
    config
}

fn orchestrator(
    ledger: &Arc<SimulatedLedger>,
    bridge: &Arc<SimulatedBridge>,
    store: &Arc<dyn RecordStore>,
    events: &Arc<MemorySink>,
    audit: AuditLog,
) -> TransferOrchestrator {
    let mut keyring = Keyring::new();
    keyring.insert(Keyring::dev_key("alice"));
    TransferOrchestrator::new(
        config(),
        Collaborators {
            ledger: ledger.clone(),
            bridge: bridge.clone(),
            store: store.clone(),
            events: events.clone(),
            signer: Arc::new(keyring),
            audit: Arc::new(audit),
        },
    )
    .unwrap()
    .with_route_seed(7)
}

impl Rig {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryRecordStore::new()))
    }

    fn with_store(store: Arc<dyn RecordStore>) -> Self {
        let alice = Keyring::dev_account("alice");
        let ledger = Arc::new(SimulatedLedger::new());
        ledger.fund(&alice, dec(100_000));
        ledger.set_network_load(Decimal::new(15, 2));
        let bridge = Arc::new(SimulatedBridge::new());
        let events = Arc::new(MemorySink::new());
        let orchestrator = Arc::new(orchestrator(
            &ledger,
            &bridge,
            &store,
            &events,
            AuditLog::in_memory(),
        ));
        Self {
            orchestrator,
            ledger,
            bridge,
            store,
            events,
            alice,
            custody: Keyring::dev_account("custody"),
        }
    }

    fn request(&self, raw: &str, direction: Direction, amount: i64) -> TransferRequest {
        TransferRequest::with_id(id(raw), direction, dec(amount), self.alice.clone())
    }

    async fn submit(&self, raw: &str, direction: Direction, amount: i64) -> TransferRecord {
        self.orchestrator
            .submit(self.request(raw, direction, amount))
            .await
            .unwrap()
    }

    /// The custodian pays `amount` back to `to` on the source ledger.
    async fn release(&self, raw: &str, to: &AccountId, amount: Decimal) -> TxRef {
        let sequence = self.ledger.sequence_of(&self.custody) + 1;
        let signed = SignedTransfer::sign(
            &Keyring::dev_key("custody"),
            id(raw),
            to.clone(),
            amount,
            sequence,
        );
        self.ledger.submit_signed_transfer(&signed).await.unwrap()
    }

    fn monitor(&self) -> BalanceMonitor {
        let config = config();
        BalanceMonitor::new(
            config.monitor,
            &config.retry,
            self.custody.clone(),
            self.ledger.clone(),
            self.bridge.clone(),
            self.store.clone(),
            self.events.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// Source to destination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn source_to_dest_completes_with_bounded_fee() {
    let rig = Rig::new();
    let record = rig.submit("happy", Direction::SourceToDest, 1000).await;

    assert_eq!(record.status, TransferStatus::Completed);
    let assessment = record.assessment.as_ref().unwrap();
    assert_eq!(assessment.score, Decimal::new(85, 2));
    assert!(assessment.accepted);

    let fee = record.fee().unwrap();
    let net = record.net_amount().unwrap();
    assert!(fee >= dec(10) && fee <= dec(50), "fee {fee}");
    assert!(net >= dec(950) && net <= dec(990), "net {net}");
    assert_eq!(fee + net, dec(1000));

    assert_eq!(
        record.visited(),
        vec![
            TransferStatus::Created,
            TransferStatus::RiskAssessed,
            TransferStatus::RouteSelected,
            TransferStatus::SourceSideDone,
            TransferStatus::DestSideDone,
            TransferStatus::Completed,
        ]
    );

    assert_eq!(rig.ledger.balance_of(&rig.alice), dec(100_000) - net);
    assert_eq!(rig.ledger.balance_of(&rig.custody), net);
    assert_eq!(rig.bridge.balance_of(&rig.alice), net);
    assert_eq!(rig.bridge.supply(), net);
    assert!(record.source_tx.is_some() && record.dest_tx.is_some());
}

#[tokio::test]
async fn low_score_is_rejected_without_touching_ledgers() {
    let rig = Rig::new();
    rig.ledger.set_network_load(Decimal::new(6, 1));
    let record = rig.submit("risky", Direction::SourceToDest, 1000).await;

    assert_eq!(record.status, TransferStatus::Rejected);
    assert!(record.selection.is_none());
    assert_eq!(rig.ledger.submission_count(), 0);
    assert_eq!(rig.bridge.mutation_count(), 0);

    let audited = rig.orchestrator.audit_log().get(record.id()).unwrap();
    assert_eq!(audited.score, Decimal::new(4, 1));
    assert!(!audited.accepted);
    assert_eq!(audited.features.network_load, Decimal::new(6, 1));
    assert_eq!(audited.features.amount, dec(1000));

    let rejected = rig
        .events
        .events()
        .into_iter()
        .find(|e| e.kind() == "transfer_rejected")
        .unwrap();
    assert_eq!(rejected.request_id(), Some(record.id()));
}

#[tokio::test]
async fn mint_failing_past_retry_budget_halts() {
    let rig = Rig::new();
    rig.bridge.inject(FaultPlan {
        network_failures: 10,
        ..FaultPlan::default()
    });
    let record = rig.submit("stuck", Direction::SourceToDest, 1000).await;

    assert_eq!(record.status, TransferStatus::Halted);
    assert!(record.source_tx.is_some());
    assert!(record.dest_tx.is_none());
    assert_eq!(rig.bridge.mutation_count(), 3);
    assert!(record.failure.as_deref().unwrap().contains("OB_ERR_500"));

    let halted = rig.orchestrator.halted_records().unwrap();
    assert_eq!(halted.len(), 1);
    assert_eq!(halted[0].id(), record.id());
    assert!(rig.events.events().iter().any(|e| matches!(
        e,
        BridgeEvent::TransferHalted {
            status_before: TransferStatus::SourceSideDone,
            ..
        }
    )));
}

#[tokio::test]
async fn unreachable_destination_halts_after_lock() {
    let rig = Rig::new();
    rig.bridge.set_unreachable(true);
    let record = rig.submit("dark", Direction::SourceToDest, 500).await;
    assert_eq!(record.status, TransferStatus::Halted);
    assert_eq!(rig.ledger.applied_count(), 1);
}

#[tokio::test]
async fn lost_response_is_adopted_not_repeated() {
    let rig = Rig::new();
    rig.ledger.inject(FaultPlan {
        lost_responses: 1,
        ..FaultPlan::default()
    });
    let record = rig.submit("lost", Direction::SourceToDest, 200).await;

    assert_eq!(record.status, TransferStatus::Completed);
    assert_eq!(rig.ledger.submission_count(), 1);
    assert_eq!(rig.ledger.applied_count(), 1);
    assert_eq!(rig.ledger.sequence_of(&rig.alice), 1);
}

/// Source ledger whose transfers confirm `delay` after submission, whether
/// or not the caller is still waiting.
struct LateLedger {
    inner: Arc<SimulatedLedger>,
    delay: Duration,
}

#[async_trait]
impl LedgerAdapter for LateLedger {
    async fn load_account(&self, account: &AccountId) -> AdapterResult<AccountState> {
        self.inner.load_account(account).await
    }

    async fn submit_signed_transfer(&self, transfer: &SignedTransfer) -> AdapterResult<TxRef> {
        let inner = self.inner.clone();
        let transfer = transfer.clone();
        let delay = self.delay;
        let landing = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.submit_signed_transfer(&transfer).await
        });
        landing
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?
    }

    async fn lookup_transfer(&self, request_id: &RequestId) -> AdapterResult<Option<TxRef>> {
        self.inner.lookup_transfer(request_id).await
    }

    async fn network_load(&self) -> AdapterResult<Decimal> {
        self.inner.network_load().await
    }

    async fn balance(&self, account: &AccountId) -> AdapterResult<Decimal> {
        self.inner.balance(account).await
    }
}

#[tokio::test]
async fn lock_confirming_after_timeout_halts_instead_of_failing() {
    let alice = Keyring::dev_account("alice");
    let ledger = Arc::new(SimulatedLedger::new());
    ledger.fund(&alice, dec(10_000));
    ledger.set_network_load(Decimal::new(15, 2));
    let bridge = Arc::new(SimulatedBridge::new());

    let mut config = config();
    config.retry.max_attempts = 1;
    config.retry.call_timeout_ms = 50;
    let mut keyring = Keyring::new();
    keyring.insert(Keyring::dev_key("alice"));
    let orchestrator = TransferOrchestrator::new(
        config,
        Collaborators {
            ledger: Arc::new(LateLedger {
                inner: ledger.clone(),
                delay: Duration::from_millis(150),
            }),
            bridge: bridge.clone(),
            store: Arc::new(MemoryRecordStore::new()),
            events: Arc::new(MemorySink::new()),
            signer: Arc::new(keyring),
            audit: Arc::new(AuditLog::in_memory()),
        },
    )
    .unwrap()
    .with_route_seed(7);

    let record = orchestrator
        .submit(TransferRequest::with_id(
            id("late"),
            Direction::SourceToDest,
            dec(1000),
            alice.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(record.status, TransferStatus::Halted);
    assert!(record.failure.as_deref().unwrap().contains("outcome unknown"));
    assert_eq!(bridge.mutation_count(), 0);

    // The lock lands after the orchestrator stopped waiting for it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let landed = ledger.transfer(record.id()).unwrap();
    let net = record.net_amount().unwrap();
    assert_eq!(landed.amount, net);
    assert_eq!(ledger.balance_of(&alice), dec(10_000) - net);

    let halted = orchestrator.halted_records().unwrap();
    assert_eq!(halted.len(), 1);
    assert_eq!(halted[0].id(), record.id());
}

// ---------------------------------------------------------------------------
// Idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replayed_request_moves_funds_once() {
    let rig = Rig::new();
    let first = rig.submit("twice", Direction::SourceToDest, 1000).await;
    let second = rig.submit("twice", Direction::SourceToDest, 1000).await;

    assert_eq!(first.status, TransferStatus::Completed);
    assert_eq!(second.status, TransferStatus::Completed);
    assert_eq!(first.source_tx, second.source_tx);
    assert_eq!(first.dest_tx, second.dest_tx);
    assert_eq!(first.net_amount(), second.net_amount());
    assert_eq!(rig.ledger.submission_count(), 1);
    assert_eq!(rig.bridge.mutation_count(), 1);
    assert_eq!(rig.orchestrator.records().unwrap().len(), 1);
    assert_eq!(rig.orchestrator.audit_log().len(), 1);
}

#[tokio::test]
async fn reused_id_with_other_parameters_is_invalid() {
    let rig = Rig::new();
    rig.submit("reuse", Direction::SourceToDest, 1000).await;
    let err = rig
        .orchestrator
        .submit(rig.request("reuse", Direction::SourceToDest, 999))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Validation { .. }));
    assert_eq!(err.request_id(), Some("reuse"));
    assert_eq!(rig.ledger.submission_count(), 1);
}

#[tokio::test]
async fn invalid_amount_never_creates_a_record() {
    let rig = Rig::new();
    let err = rig
        .orchestrator
        .submit(TransferRequest::with_id(
            id("neg"),
            Direction::SourceToDest,
            dec(-1),
            rig.alice.clone(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Validation { .. }));
    assert!(rig.orchestrator.record(&id("neg")).is_err());
    assert!(matches!(
        rig.events.events().as_slice(),
        [BridgeEvent::TransferInvalid { request_id, .. }] if request_id == "neg"
    ));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_only_before_first_mutation() {
    let rig = Rig::new();
    let prepared = rig
        .orchestrator
        .prepare(rig.request("early", Direction::SourceToDest, 100))
        .await
        .unwrap();
    let cancelled = rig.orchestrator.cancel(prepared.id()).await.unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);
    assert_eq!(rig.ledger.submission_count(), 0);

    let done = rig.submit("late", Direction::SourceToDest, 100).await;
    let err = rig.orchestrator.cancel(done.id()).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::NotCancellable {
            status: TransferStatus::Completed,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// Destination to source
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dest_to_source_waits_for_custodial_release() {
    let rig = Rig::new();
    let inbound = rig.submit("in", Direction::SourceToDest, 1000).await;
    let minted = inbound.net_amount().unwrap();

    let outbound = rig.submit("out", Direction::DestToSource, 500).await;
    assert_eq!(outbound.status, TransferStatus::SourceSideDone);
    assert!(outbound.awaiting_release);
    assert!(outbound.dest_tx.is_some());
    assert!(outbound.source_tx.is_none());
    assert_eq!(rig.bridge.balance_of(&rig.alice), minted - dec(500));
    assert_eq!(rig.orchestrator.pending_releases().unwrap().len(), 1);

    let net = outbound.net_amount().unwrap();
    assert!(rig.events.events().iter().any(|e| matches!(
        e,
        BridgeEvent::ReleaseRequested { amount, .. } if *amount == net
    )));

    let tx = rig.release("out", &rig.alice, net).await;
    let completed = rig
        .orchestrator
        .confirm_source_release(outbound.id(), tx.clone())
        .await
        .unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
    assert!(!completed.awaiting_release);
    assert_eq!(completed.source_tx, Some(tx.clone()));

    // confirming again is a no-op
    let again = rig
        .orchestrator
        .confirm_source_release(outbound.id(), tx)
        .await
        .unwrap();
    assert_eq!(again.history.len(), completed.history.len());
    assert!(rig.orchestrator.pending_releases().unwrap().is_empty());
}

#[tokio::test]
async fn resume_observes_release_on_source_ledger() {
    let rig = Rig::new();
    rig.submit("seed", Direction::SourceToDest, 1000).await;
    let outbound = rig.submit("back", Direction::DestToSource, 300).await;
    let net = outbound.net_amount().unwrap();

    let still_waiting = rig.orchestrator.resume(outbound.id()).await.unwrap();
    assert_eq!(still_waiting.status, TransferStatus::SourceSideDone);

    rig.release("back", &rig.alice, net).await;
    let resumed = rig.orchestrator.resume_pending().await.unwrap();
    assert_eq!(resumed.len(), 1);
    assert_eq!(resumed[0].status, TransferStatus::Completed);
}

#[tokio::test]
async fn burn_beyond_balance_fails_cleanly() {
    let rig = Rig::new();
    let record = rig.submit("overdraw", Direction::DestToSource, 10).await;
    assert_eq!(record.status, TransferStatus::Failed);
    assert!(record.failure.as_deref().unwrap().contains("insufficient funds"));
    assert_eq!(rig.bridge.supply(), Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn monitor_is_clean_after_round_trip() {
    let rig = Rig::new();
    rig.submit("there", Direction::SourceToDest, 1000).await;
    let back = rig.submit("back-again", Direction::DestToSource, 400).await;
    rig.release("back-again", &rig.alice, back.net_amount().unwrap())
        .await;
    rig.orchestrator.resume(back.id()).await.unwrap();

    let report = rig.monitor().check_once().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(report.expected.completed, 2);
    assert_eq!(report.drift(LedgerId::Source), Some(Decimal::ZERO));
    assert_eq!(report.drift(LedgerId::Destination), Some(Decimal::ZERO));
}

#[tokio::test]
async fn halted_transfer_shows_as_drift() {
    let rig = Rig::new();
    rig.bridge.set_unreachable(true);
    let record = rig.submit("half", Direction::SourceToDest, 1000).await;
    assert_eq!(record.status, TransferStatus::Halted);
    rig.bridge.set_unreachable(false);

    let report = rig.monitor().check_once().await.unwrap();
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors[0],
        BridgeError::Consistency {
            ledger: LedgerId::Source,
            ..
        }
    ));
    assert_eq!(report.drift(LedgerId::Source), record.net_amount());
    assert!(rig.events.kinds().contains(&"drift_detected"));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_share_one_sequence() {
    let rig = Rig::new();
    let mut handles = Vec::new();
    for n in 0..8 {
        let orchestrator = rig.orchestrator.clone();
        let request = rig.request(&format!("burst-{n}"), Direction::SourceToDest, 100);
        handles.push(tokio::spawn(
            async move { orchestrator.submit(request).await },
        ));
    }
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.status, TransferStatus::Completed);
    }

    assert_eq!(rig.ledger.sequence_of(&rig.alice), 8);
    assert_eq!(rig.ledger.applied_count(), 8);
    assert_eq!(rig.ledger.submission_count(), 8);
    let mut sequences: Vec<u64> = (0..8)
        .map(|n| rig.ledger.transfer(&id(&format!("burst-{n}"))).unwrap().sequence)
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replays_of_one_request_mutate_once() {
    let rig = Rig::new();
    let mut handles = Vec::new();
    for _ in 0..4 {
        let orchestrator = rig.orchestrator.clone();
        let request = rig.request("same", Direction::SourceToDest, 100);
        handles.push(tokio::spawn(
            async move { orchestrator.submit(request).await },
        ));
    }
    for handle in handles {
        assert_eq!(
            handle.await.unwrap().unwrap().status,
            TransferStatus::Completed
        );
    }
    assert_eq!(rig.ledger.applied_count(), 1);
    let record = rig.orchestrator.record(&id("same")).unwrap();
    assert_eq!(
        Some(rig.bridge.mint_of(&id("same")).unwrap().amount),
        record.net_amount()
    );
}

// ---------------------------------------------------------------------------
// Restart recovery
// ---------------------------------------------------------------------------

fn reopen(dir: &Path) -> Arc<dyn RecordStore> {
    Arc::new(JsonFileRecordStore::open(dir).unwrap())
}

#[tokio::test]
async fn restart_adopts_lock_that_landed_before_crash() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records");
    let journal = dir.path().join("audit.jsonl");

    let rig = Rig::with_store(reopen(&records));
    let prepared = rig
        .orchestrator
        .prepare(rig.request("crash", Direction::SourceToDest, 1000))
        .await
        .unwrap();
    assert_eq!(prepared.status, TransferStatus::RouteSelected);

    // The process marked the mutation, submitted it, and died before
    // recording the outcome.
    let store = reopen(&records);
    let current = store.get(prepared.id()).unwrap().unwrap();
    let mut marked = current.record.clone();
    marked.mutation_submitted_at = Some(chrono::Utc::now());
    store
        .compare_and_swap(prepared.id(), current.version, marked)
        .unwrap();
    let signed = SignedTransfer::sign(
        &Keyring::dev_key("alice"),
        id("crash"),
        rig.custody.clone(),
        prepared.net_amount().unwrap(),
        1,
    );
    let landed = rig.ledger.submit_signed_transfer(&signed).await.unwrap();

    let restarted = orchestrator(
        &rig.ledger,
        &rig.bridge,
        &reopen(&records),
        &rig.events,
        AuditLog::with_journal(&journal).unwrap(),
    );
    let cancel = restarted.cancel(prepared.id()).await.unwrap_err();
    assert!(matches!(cancel, BridgeError::NotCancellable { .. }));

    let resumed = restarted.resume_pending().await.unwrap();
    assert_eq!(resumed.len(), 1);
    assert_eq!(resumed[0].status, TransferStatus::Completed);
    assert_eq!(resumed[0].source_tx, Some(landed));
    assert_eq!(rig.ledger.submission_count(), 1);
    assert_eq!(rig.ledger.applied_count(), 1);
}

#[tokio::test]
async fn records_and_audit_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let records = dir.path().join("records");
    let journal = dir.path().join("audit.jsonl");

    let ledger = Arc::new(SimulatedLedger::new());
    ledger.fund(&Keyring::dev_account("alice"), dec(5_000));
    ledger.set_network_load(Decimal::new(1, 1));
    let bridge = Arc::new(SimulatedBridge::new());
    let events = Arc::new(MemorySink::new());

    let first = orchestrator(
        &ledger,
        &bridge,
        &reopen(&records),
        &events,
        AuditLog::with_journal(&journal).unwrap(),
    );
    let done = first
        .submit(TransferRequest::with_id(
            id("durable"),
            Direction::SourceToDest,
            dec(1000),
            Keyring::dev_account("alice"),
        ))
        .await
        .unwrap();
    drop(first);

    let second = orchestrator(
        &ledger,
        &bridge,
        &reopen(&records),
        &events,
        AuditLog::with_journal(&journal).unwrap(),
    );
    let reloaded = second.record(done.id()).unwrap();
    assert_eq!(reloaded.status, TransferStatus::Completed);
    assert_eq!(reloaded.source_tx, done.source_tx);
    assert_eq!(second.audit_log().get(done.id()), done.assessment);
    assert!(second.resume_pending().await.unwrap().is_empty());
}
