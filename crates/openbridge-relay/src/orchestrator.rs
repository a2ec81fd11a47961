//! Transfer orchestrator.
//!
//! Drives a [`TransferRecord`] from request to a terminal state:
//!
//! 1. Validate the request and create the record (idempotent per request id)
//! 2. Score it through the [`RiskGate`]; rejection ends here
//! 3. Fix route, fee and net amount through the [`RouteOptimizer`]
//! 4. First leg: lock on the source ledger, or burn on the destination
//! 5. Second leg: mint on the destination, or wait for the custodial release
//! 6. Complete
//!
//! Every step is persisted by compare-and-swap before the next one starts,
//! so a crashed transfer can be resumed from its last confirmed state.
//! Mutations are keyed by request id; a resumed transfer probes the ledger
//! and adopts what already landed instead of moving funds twice.

use std::sync::Arc;

use chrono::Utc;
use openbridge_gate::{AuditLog, RiskGate, RouteOptimizer};
use openbridge_types::{
    AccountId, AdapterError, BridgeConfig, BridgeError, BridgeEvent, Direction, LedgerId,
    RequestId, Result, RiskContext, TransferRecord, TransferRequest, TransferStatus, TxRef,
};
use rust_decimal::Decimal;

use crate::{
    events::EventSink,
    locks::KeyedLocks,
    ports::{BridgeAdapter, LedgerAdapter},
    retry::{NotLanded, submit_with_retry},
    signer::TransferSigner,
    store::{InsertOutcome, RecordStore, Versioned},
};

/// Everything the orchestrator talks to.
pub struct Collaborators {
    pub ledger: Arc<dyn LedgerAdapter>,
    pub bridge: Arc<dyn BridgeAdapter>,
    pub store: Arc<dyn RecordStore>,
    pub events: Arc<dyn EventSink>,
    pub signer: Arc<dyn TransferSigner>,
    pub audit: Arc<AuditLog>,
}

/// The state machine driving transfers across the bridge.
pub struct TransferOrchestrator {
    config: BridgeConfig,
    ledger: Arc<dyn LedgerAdapter>,
    bridge: Arc<dyn BridgeAdapter>,
    store: Arc<dyn RecordStore>,
    events: Arc<dyn EventSink>,
    signer: Arc<dyn TransferSigner>,
    risk: RiskGate,
    routes: RouteOptimizer,
    account_locks: KeyedLocks<AccountId>,
    request_locks: KeyedLocks<RequestId>,
}

impl TransferOrchestrator {
    /// Build an orchestrator.
    ///
    /// # Errors
    /// Returns [`BridgeError::FatalConfig`] if `config` does not validate.
    pub fn new(config: BridgeConfig, deps: Collaborators) -> Result<Self> {
        config.validate()?;
        let risk = RiskGate::new(config.risk.clone(), deps.audit);
        let routes = RouteOptimizer::new(config.routes.clone());
        Ok(Self {
            config,
            ledger: deps.ledger,
            bridge: deps.bridge,
            store: deps.store,
            events: deps.events,
            signer: deps.signer,
            risk,
            routes,
            account_locks: KeyedLocks::new(),
            request_locks: KeyedLocks::new(),
        })
    }

    /// Seed route selection, for reproducible runs.
    #[must_use]
    pub fn with_route_seed(mut self, seed: u64) -> Self {
        self.routes = RouteOptimizer::with_seed(self.config.routes.clone(), seed);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        self.risk.audit_log()
    }

    // -----------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------

    /// Prepare and, if admitted, execute a transfer.
    ///
    /// Rejected transfers come back as `Ok` records in
    /// [`TransferStatus::Rejected`]; so do failed and halted ones. `Err` is
    /// reserved for requests that never became (or could not update) a
    /// record.
    pub async fn submit(&self, request: TransferRequest) -> Result<TransferRecord> {
        let record = self.prepare(request).await?;
        if record.status == TransferStatus::RouteSelected {
            self.execute(record.id()).await
        } else {
            Ok(record)
        }
    }

    /// Validate, record, assess and route a transfer without touching any
    /// ledger state.
    ///
    /// Re-submitting a known request id with the same parameters returns the
    /// existing record (finishing admission if it was interrupted).
    ///
    /// # Errors
    /// [`BridgeError::Validation`] for invalid requests and for a known id
    /// with different parameters; storage errors from the record store.
    pub async fn prepare(&self, request: TransferRequest) -> Result<TransferRecord> {
        if let Err(err) = self.validate(&request) {
            self.reject_invalid(&request.id, &err);
            return Err(err);
        }

        let _guard = self.request_locks.lock(&request.id).await;
        let mut current = match self.store.insert(TransferRecord::new(request.clone()))? {
            InsertOutcome::Inserted(versioned) => {
                tracing::info!(
                    request_id = %request.id,
                    direction = %request.direction,
                    amount = %request.amount,
                    initiator = request.initiator.short(),
                    "transfer created"
                );
                versioned
            }
            InsertOutcome::Existing(versioned) => {
                if !versioned.record.request.same_parameters(&request) {
                    let err = BridgeError::Validation {
                        request_id: request.id.to_string(),
                        reason: "request id already used with different parameters".into(),
                    };
                    self.reject_invalid(&request.id, &err);
                    return Err(err);
                }
                tracing::debug!(
                    request_id = %request.id,
                    status = %versioned.record.status,
                    "idempotent replay"
                );
                versioned
            }
        };

        self.admit(&mut current).await?;
        Ok(current.record)
    }

    /// Run the ledger legs of a prepared transfer.
    ///
    /// # Errors
    /// [`BridgeError::RiskRejected`] for a rejected transfer,
    /// [`BridgeError::InvalidTransition`] if the transfer was never
    /// prepared, [`BridgeError::TransferNotFound`] for unknown ids.
    pub async fn execute(&self, request_id: &RequestId) -> Result<TransferRecord> {
        let _guard = self.request_locks.lock(request_id).await;
        let mut current = self.load(request_id)?;
        match current.record.status {
            TransferStatus::Rejected => {
                let (score, threshold) = current
                    .record
                    .assessment
                    .as_ref()
                    .map_or((Decimal::ZERO, self.risk.threshold()), |a| {
                        (a.score, a.threshold)
                    });
                return Err(BridgeError::RiskRejected {
                    request_id: request_id.to_string(),
                    score,
                    threshold,
                });
            }
            status @ (TransferStatus::Created | TransferStatus::RiskAssessed) => {
                return Err(BridgeError::InvalidTransition {
                    request_id: request_id.to_string(),
                    from: status,
                    to: TransferStatus::SourceSideDone,
                });
            }
            _ => {}
        }
        self.drive(&mut current).await?;
        Ok(current.record)
    }

    /// Continue a transfer from wherever it stopped: finish admission,
    /// adopt or resubmit pending mutations, or look for a custodial release.
    /// Terminal records are returned unchanged.
    pub async fn resume(&self, request_id: &RequestId) -> Result<TransferRecord> {
        let _guard = self.request_locks.lock(request_id).await;
        let mut current = self.load(request_id)?;
        if current.record.is_terminal() {
            return Ok(current.record);
        }
        self.admit(&mut current).await?;
        self.drive(&mut current).await?;
        Ok(current.record)
    }

    /// Resume every non-terminal record, oldest first. Records that fail to
    /// resume are logged and skipped.
    pub async fn resume_pending(&self) -> Result<Vec<TransferRecord>> {
        let pending: Vec<RequestId> = self
            .store
            .list()?
            .into_iter()
            .filter(|v| !v.record.is_terminal())
            .map(|v| v.record.id().clone())
            .collect();
        let mut resumed = Vec::with_capacity(pending.len());
        for request_id in pending {
            match self.resume(&request_id).await {
                Ok(record) => resumed.push(record),
                Err(err) => {
                    tracing::error!(request_id = %request_id, error = %err, "resume failed");
                }
            }
        }
        Ok(resumed)
    }

    /// Cancel a transfer that has not yet issued a chain mutation.
    ///
    /// # Errors
    /// [`BridgeError::NotCancellable`] once a mutation has been submitted or
    /// the record reached another terminal state.
    pub async fn cancel(&self, request_id: &RequestId) -> Result<TransferRecord> {
        let _guard = self.request_locks.lock(request_id).await;
        let mut current = self.load(request_id)?;
        let status = current.record.status;
        if status == TransferStatus::Cancelled {
            return Ok(current.record);
        }
        if !status.is_cancellable() || current.record.mutation_submitted_at.is_some() {
            return Err(BridgeError::NotCancellable {
                request_id: request_id.to_string(),
                status,
            });
        }
        self.transition(&mut current, TransferStatus::Cancelled)?;
        self.publish(BridgeEvent::TransferCancelled {
            request_id: request_id.clone(),
        });
        Ok(current.record)
    }

    /// Record that the custodian released funds on the source ledger for a
    /// `DestToSource` transfer, completing it.
    ///
    /// Confirming an already completed transfer with the same transaction is
    /// a no-op.
    ///
    /// # Errors
    /// [`BridgeError::InvalidTransition`] unless the transfer is awaiting
    /// release.
    pub async fn confirm_source_release(
        &self,
        request_id: &RequestId,
        tx: TxRef,
    ) -> Result<TransferRecord> {
        let _guard = self.request_locks.lock(request_id).await;
        let mut current = self.load(request_id)?;
        let record = &current.record;
        if record.status == TransferStatus::Completed && record.source_tx.as_ref() == Some(&tx) {
            return Ok(current.record);
        }
        if record.request.direction != Direction::DestToSource
            || record.status != TransferStatus::SourceSideDone
            || !record.awaiting_release
        {
            return Err(BridgeError::InvalidTransition {
                request_id: request_id.to_string(),
                from: record.status,
                to: TransferStatus::DestSideDone,
            });
        }
        self.complete_release(&mut current, tx)?;
        self.drive(&mut current).await?;
        Ok(current.record)
    }

    /// # Errors
    /// [`BridgeError::TransferNotFound`] for unknown ids.
    pub fn record(&self, request_id: &RequestId) -> Result<TransferRecord> {
        self.load(request_id).map(|v| v.record)
    }

    /// All records, oldest first.
    pub fn records(&self) -> Result<Vec<TransferRecord>> {
        Ok(self.store.list()?.into_iter().map(|v| v.record).collect())
    }

    /// Records that need manual reconciliation.
    pub fn halted_records(&self) -> Result<Vec<TransferRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.status == TransferStatus::Halted)
            .collect())
    }

    /// `DestToSource` records waiting for the custodian.
    pub fn pending_releases(&self) -> Result<Vec<TransferRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.awaiting_release && !r.is_terminal())
            .collect())
    }

    // -----------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------

    fn validate(&self, request: &TransferRequest) -> Result<()> {
        request.validate(self.config.limits.max_amount)?;
        if request.direction == Direction::SourceToDest
            && !self.signer.can_sign(&request.initiator)
        {
            return Err(BridgeError::Validation {
                request_id: request.id.to_string(),
                reason: format!("no signing key for initiator {}", request.initiator.short()),
            });
        }
        Ok(())
    }

    fn reject_invalid(&self, request_id: &RequestId, err: &BridgeError) {
        tracing::warn!(request_id = %request_id, error = %err, "invalid transfer request");
        self.publish(BridgeEvent::TransferInvalid {
            request_id: request_id.to_string(),
            reason: err.to_string(),
        });
    }

    /// Created → RiskAssessed → {Rejected | RouteSelected}.
    async fn admit(&self, current: &mut Versioned) -> Result<()> {
        if current.record.status == TransferStatus::Created {
            let request = current.record.request.clone();
            let context = self.risk_context(&request).await?;
            let assessment = match self.risk.evaluate(
                &request.id,
                request.amount,
                request.direction,
                context,
            ) {
                Ok(assessment) => assessment,
                // Assessed before an interruption; the audited decision stands.
                Err(BridgeError::DuplicateAssessment { .. }) => {
                    self.audit_log().get(&request.id).ok_or_else(|| {
                        BridgeError::Internal(format!("audit entry for {} vanished", request.id))
                    })?
                }
                Err(err) => return Err(err),
            };
            let accepted = assessment.accepted;
            let score = assessment.score;
            current.record.assessment = Some(assessment);
            self.transition(current, TransferStatus::RiskAssessed)?;
            if accepted {
                self.publish(BridgeEvent::TransferAccepted {
                    request_id: request.id.clone(),
                    score,
                });
            }
        }

        if current.record.status == TransferStatus::RiskAssessed {
            let request = current.record.request.clone();
            let assessment = current.record.assessment.clone().ok_or_else(|| {
                BridgeError::Internal(format!("{} assessed without an assessment", request.id))
            })?;
            if !assessment.accepted {
                self.transition(current, TransferStatus::Rejected)?;
                self.publish(BridgeEvent::TransferRejected {
                    request_id: request.id.clone(),
                    score: assessment.score,
                    threshold: assessment.threshold,
                    features: assessment.features,
                });
                return Ok(());
            }

            let selection = self
                .routes
                .select(&request.id, request.direction, request.amount)?;
            current.record.selection = Some(selection.clone());
            self.transition(current, TransferStatus::RouteSelected)?;
            self.publish(BridgeEvent::RouteSelected {
                request_id: request.id,
                route: selection.route,
                fee: selection.fee,
                net_amount: selection.net_amount,
            });
        }
        Ok(())
    }

    /// Network load from the source ledger (worst case if unobservable) and
    /// the initiator's completed-transfer count.
    async fn risk_context(&self, request: &TransferRequest) -> Result<RiskContext> {
        let completed = self
            .store
            .list()?
            .iter()
            .filter(|v| {
                v.record.status == TransferStatus::Completed
                    && v.record.request.initiator == request.initiator
            })
            .count();
        let completed = u32::try_from(completed).unwrap_or(u32::MAX);

        let load = tokio::time::timeout(self.config.retry.call_timeout(), self.ledger.network_load())
            .await
            .unwrap_or_else(|_| Err(AdapterError::Timeout(self.config.retry.call_timeout_ms)));
        match load {
            Ok(network_load) => Ok(RiskContext {
                network_load,
                completed_transfers: completed,
            }),
            Err(err) => {
                tracing::warn!(
                    request_id = %request.id,
                    error = %err,
                    "network load unavailable, assuming full load"
                );
                Ok(RiskContext::fail_closed(completed))
            }
        }
    }

    // -----------------------------------------------------------------
    // Ledger legs
    // -----------------------------------------------------------------

    /// Advance through the ledger legs until the record is terminal or
    /// waiting on something external.
    ///
    /// Before minting, the destination is checked for an earlier mint unless
    /// this call just landed the lock it depends on.
    async fn drive(&self, current: &mut Versioned) -> Result<()> {
        let mut lock_just_landed = false;
        loop {
            match (current.record.status, current.record.request.direction) {
                (TransferStatus::RouteSelected, _) => {
                    self.first_leg(current).await?;
                    lock_just_landed = true;
                }
                (TransferStatus::SourceSideDone, Direction::SourceToDest) => {
                    self.mint_leg(current, !lock_just_landed).await?;
                }
                (TransferStatus::SourceSideDone, Direction::DestToSource) => {
                    if !self.observe_release(current).await? {
                        return Ok(());
                    }
                }
                (TransferStatus::DestSideDone, direction) => {
                    self.transition(current, TransferStatus::Completed)?;
                    let net_amount = current.record.net_amount().unwrap_or_default();
                    tracing::info!(
                        request_id = %current.record.id(),
                        %direction,
                        %net_amount,
                        "transfer completed"
                    );
                    self.publish(BridgeEvent::TransferCompleted {
                        request_id: current.record.id().clone(),
                        direction,
                        net_amount,
                    });
                }
                _ => return Ok(()),
            }
        }
    }

    /// Mark the point of no cancellation, then lock or burn.
    async fn first_leg(&self, current: &mut Versioned) -> Result<()> {
        let resuming = current.record.mutation_submitted_at.is_some();
        if !resuming {
            current.record.mutation_submitted_at = Some(Utc::now());
            self.persist(current)?;
        }
        match current.record.request.direction {
            Direction::SourceToDest => self.lock_leg(current, resuming).await,
            Direction::DestToSource => self.burn_leg(current, resuming).await,
        }
    }

    /// `SourceToDest`: move the net amount from the initiator to custody on
    /// the source ledger.
    async fn lock_leg(&self, current: &mut Versioned, resuming: bool) -> Result<()> {
        let request_id = current.record.id().clone();
        let initiator = current.record.request.initiator.clone();
        let custody = self.config.custody_account.clone();
        let net_amount = net_amount_of(&current.record)?;

        let outcome = {
            let _account = self.account_locks.lock(&initiator).await;
            let ledger = self.ledger.as_ref();
            let signer = self.signer.as_ref();
            let (id, from, to) = (&request_id, &initiator, &custody);
            submit_with_retry(
                &self.config.retry,
                "submit_signed_transfer",
                &request_id,
                resuming,
                move || async move {
                    let account = ledger.load_account(from).await?;
                    let signed = signer
                        .sign(id, from, to, net_amount, account.next_sequence())
                        .ok_or(AdapterError::SignatureInvalid)?;
                    ledger.submit_signed_transfer(&signed).await
                },
                move || async move { ledger.lookup_transfer(id).await },
            )
            .await
        };

        match outcome {
            Ok(landed) => {
                current.record.attempts += landed.attempts;
                current.record.source_tx = Some(landed.tx.clone());
                self.transition(current, TransferStatus::SourceSideDone)?;
                self.publish(BridgeEvent::MutationConfirmed {
                    request_id,
                    ledger: LedgerId::Source,
                    tx: landed.tx,
                });
                Ok(())
            }
            Err(failure) => {
                current.record.attempts += failure.attempts;
                let reason = leg_failure(&request_id, LedgerId::Source, "source lock", &failure);
                if failure.uncertain {
                    self.halt(current, reason)
                } else {
                    self.fail(current, reason)
                }
            }
        }
    }

    /// `DestToSource`: burn the full amount from the initiator.
    async fn burn_leg(&self, current: &mut Versioned, resuming: bool) -> Result<()> {
        let request_id = current.record.id().clone();
        let initiator = current.record.request.initiator.clone();
        let amount = current.record.request.amount;
        let net_amount = net_amount_of(&current.record)?;

        let bridge = self.bridge.as_ref();
        let (id, account) = (&request_id, &initiator);
        let outcome = submit_with_retry(
            &self.config.retry,
            "burn",
            &request_id,
            resuming,
            move || async move { bridge.burn(account, amount, id).await },
            move || async move { bridge.lookup_burn(id).await },
        )
        .await;

        match outcome {
            Ok(landed) => {
                current.record.attempts += landed.attempts;
                current.record.dest_tx = Some(landed.tx.clone());
                current.record.awaiting_release = true;
                self.transition(current, TransferStatus::SourceSideDone)?;
                self.publish(BridgeEvent::MutationConfirmed {
                    request_id: request_id.clone(),
                    ledger: LedgerId::Destination,
                    tx: landed.tx,
                });
                tracing::info!(
                    request_id = %request_id,
                    account = initiator.short(),
                    %net_amount,
                    "burn confirmed, awaiting custodial release"
                );
                self.publish(BridgeEvent::ReleaseRequested {
                    request_id,
                    account: initiator,
                    amount: net_amount,
                });
                Ok(())
            }
            Err(failure) => {
                current.record.attempts += failure.attempts;
                let reason = leg_failure(&request_id, LedgerId::Destination, "burn", &failure);
                if failure.uncertain {
                    self.halt(current, reason)
                } else {
                    self.fail(current, reason)
                }
            }
        }
    }

    /// `SourceToDest`: mint the net amount to the initiator. The lock has
    /// already landed, so any failure here halts the transfer.
    async fn mint_leg(&self, current: &mut Versioned, probe_first: bool) -> Result<()> {
        let request_id = current.record.id().clone();
        let initiator = current.record.request.initiator.clone();
        let net_amount = net_amount_of(&current.record)?;

        let bridge = self.bridge.as_ref();
        let (id, account) = (&request_id, &initiator);
        let outcome = submit_with_retry(
            &self.config.retry,
            "mint",
            &request_id,
            probe_first,
            move || async move { bridge.mint(account, net_amount, id).await },
            move || async move { bridge.lookup_mint(id).await },
        )
        .await;

        match outcome {
            Ok(landed) => {
                current.record.attempts += landed.attempts;
                current.record.dest_tx = Some(landed.tx.clone());
                self.transition(current, TransferStatus::DestSideDone)?;
                self.publish(BridgeEvent::MutationConfirmed {
                    request_id,
                    ledger: LedgerId::Destination,
                    tx: landed.tx,
                });
                Ok(())
            }
            Err(failure) => {
                current.record.attempts += failure.attempts;
                let reason = leg_failure(&request_id, LedgerId::Destination, "mint", &failure);
                self.halt(current, reason)
            }
        }
    }

    /// Look for the custodial release on the source ledger. Returns whether
    /// the record advanced.
    async fn observe_release(&self, current: &mut Versioned) -> Result<bool> {
        let request_id = current.record.id().clone();
        let lookup = tokio::time::timeout(
            self.config.retry.call_timeout(),
            self.ledger.lookup_transfer(&request_id),
        )
        .await
        .unwrap_or_else(|_| Err(AdapterError::Timeout(self.config.retry.call_timeout_ms)));
        match lookup {
            Ok(Some(tx)) => {
                self.complete_release(current, tx)?;
                Ok(true)
            }
            Ok(None) => {
                tracing::debug!(request_id = %request_id, "release not yet observed");
                Ok(false)
            }
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "release lookup failed");
                Ok(false)
            }
        }
    }

    fn complete_release(&self, current: &mut Versioned, tx: TxRef) -> Result<()> {
        current.record.source_tx = Some(tx.clone());
        current.record.awaiting_release = false;
        self.transition(current, TransferStatus::DestSideDone)?;
        self.publish(BridgeEvent::MutationConfirmed {
            request_id: current.record.id().clone(),
            ledger: LedgerId::Source,
            tx,
        });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Persistence and events
    // -----------------------------------------------------------------

    fn load(&self, request_id: &RequestId) -> Result<Versioned> {
        self.store
            .get(request_id)?
            .ok_or_else(|| BridgeError::TransferNotFound {
                request_id: request_id.to_string(),
            })
    }

    fn persist(&self, current: &mut Versioned) -> Result<()> {
        let request_id = current.record.id().clone();
        *current = self
            .store
            .compare_and_swap(&request_id, current.version, current.record.clone())?;
        Ok(())
    }

    fn transition(&self, current: &mut Versioned, target: TransferStatus) -> Result<()> {
        let from = current.record.status;
        current.record.advance(target)?;
        self.persist(current)?;
        tracing::debug!(
            request_id = %current.record.id(),
            %from,
            to = %target,
            version = current.version,
            "transfer advanced"
        );
        Ok(())
    }

    fn fail(&self, current: &mut Versioned, reason: String) -> Result<()> {
        current.record.fail(TransferStatus::Failed, reason.clone())?;
        self.persist(current)?;
        tracing::warn!(request_id = %current.record.id(), %reason, "transfer failed");
        self.publish(BridgeEvent::TransferFailed {
            request_id: current.record.id().clone(),
            reason,
        });
        Ok(())
    }

    fn halt(&self, current: &mut Versioned, reason: String) -> Result<()> {
        let status_before = current.record.status;
        current.record.fail(TransferStatus::Halted, reason.clone())?;
        self.persist(current)?;
        tracing::error!(
            request_id = %current.record.id(),
            %status_before,
            %reason,
            "transfer halted, manual reconciliation required"
        );
        self.publish(BridgeEvent::TransferHalted {
            request_id: current.record.id().clone(),
            status_before,
            reason,
        });
        Ok(())
    }

    fn publish(&self, event: BridgeEvent) {
        self.events.publish(&event);
    }
}

fn net_amount_of(record: &TransferRecord) -> Result<Decimal> {
    record.net_amount().ok_or_else(|| {
        BridgeError::Internal(format!("{} has no route selection", record.id()))
    })
}

fn leg_failure(
    request_id: &RequestId,
    ledger: LedgerId,
    operation: &str,
    failure: &NotLanded,
) -> String {
    if failure.error.is_retryable() {
        let outcome = if failure.uncertain {
            ", outcome unknown"
        } else {
            ""
        };
        BridgeError::Network {
            request_id: request_id.to_string(),
            ledger,
            reason: format!(
                "{operation} gave up after {} attempt(s){outcome}: {}",
                failure.attempts, failure.error
            ),
        }
        .to_string()
    } else {
        format!("{ledger} refused {operation}: {}", failure.error)
    }
}
