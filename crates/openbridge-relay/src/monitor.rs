//! Balance monitor.
//!
//! Independent, read-only task. Each tick it observes the custody account on
//! the source ledger and the outstanding supply on the destination ledger,
//! compares both with the balances implied by completed transfer records,
//! and publishes [`BridgeEvent::DriftDetected`] when they disagree beyond the
//! configured tolerance.
//!
//! The monitor never writes a transfer record. A ledger it cannot reach is
//! reported and skipped until the next tick.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use openbridge_types::{
    AccountId, AdapterError, BalanceSnapshot, BridgeError, BridgeEvent, LedgerId, MonitorConfig,
    Result, RetryPolicy, constants,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    events::EventSink,
    ports::{AdapterResult, BridgeAdapter, LedgerAdapter},
    reconcile::ExpectedBalances,
    store::RecordStore,
};

/// Outcome of one monitor tick.
#[derive(Debug)]
pub struct DriftReport {
    pub checked_at: DateTime<Utc>,
    /// Ledgers that could be observed this tick.
    pub snapshots: Vec<BalanceSnapshot>,
    pub expected: ExpectedBalances,
    /// One [`BridgeError::Consistency`] per ledger out of tolerance.
    pub errors: Vec<BridgeError>,
    /// Ledgers that could not be observed.
    pub unreachable: Vec<LedgerId>,
}

impl DriftReport {
    /// Every ledger was observed and within tolerance.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.unreachable.is_empty()
    }

    /// `observed − expected` for an observed ledger.
    #[must_use]
    pub fn drift(&self, ledger: LedgerId) -> Option<Decimal> {
        self.snapshots
            .iter()
            .find(|s| s.ledger == ledger)
            .map(|s| self.expected.drift(ledger, s.amount))
    }
}

/// Periodic reconciliation of observed against expected balances.
pub struct BalanceMonitor {
    config: MonitorConfig,
    call_timeout: std::time::Duration,
    custody: AccountId,
    ledger: Arc<dyn LedgerAdapter>,
    bridge: Arc<dyn BridgeAdapter>,
    store: Arc<dyn RecordStore>,
    events: Arc<dyn EventSink>,
    history: Mutex<VecDeque<BalanceSnapshot>>,
}

impl BalanceMonitor {
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        retry: &RetryPolicy,
        custody: AccountId,
        ledger: Arc<dyn LedgerAdapter>,
        bridge: Arc<dyn BridgeAdapter>,
        store: Arc<dyn RecordStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            call_timeout: retry.call_timeout(),
            custody,
            ledger,
            bridge,
            store,
            events,
            history: Mutex::new(VecDeque::with_capacity(constants::MONITOR_HISTORY_LEN)),
        }
    }

    /// Observe both ledgers once.
    ///
    /// # Errors
    /// Only if the record store cannot be read. Drift and unreachable
    /// ledgers are part of the report, not errors.
    pub async fn check_once(&self) -> Result<DriftReport> {
        let records = self.store.list()?;
        let expected = ExpectedBalances::from_records(
            self.config.opening_source_balance,
            self.config.opening_dest_supply,
            records.iter().map(|v| &v.record),
        );

        let mut report = DriftReport {
            checked_at: Utc::now(),
            snapshots: Vec::with_capacity(2),
            expected,
            errors: Vec::new(),
            unreachable: Vec::new(),
        };

        let source = self.observe(self.ledger.balance(&self.custody)).await;
        self.record(&mut report, LedgerId::Source, self.custody.clone(), source);

        let dest = self.observe(self.bridge.outstanding_supply()).await;
        self.record(&mut report, LedgerId::Destination, self.custody.clone(), dest);

        tracing::debug!(
            completed = expected.completed,
            observed = report.snapshots.len(),
            drifting = report.errors.len(),
            "balance check finished"
        );
        Ok(report)
    }

    /// Run [`check_once`](Self::check_once) every poll interval until
    /// `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.config.poll_interval_secs,
            custody = self.custody.short(),
            "balance monitor started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.check_once().await {
                        tracing::error!(error = %err, "balance check failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("balance monitor stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Run the monitor on its own task.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Most recent snapshots, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<BalanceSnapshot> {
        self.history.lock().iter().cloned().collect()
    }

    async fn observe(
        &self,
        call: impl std::future::Future<Output = AdapterResult<Decimal>>,
    ) -> AdapterResult<Decimal> {
        let timeout_ms = u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(AdapterError::Timeout(timeout_ms)))
    }

    fn record(
        &self,
        report: &mut DriftReport,
        ledger: LedgerId,
        account: AccountId,
        observed: AdapterResult<Decimal>,
    ) {
        let amount = match observed {
            Ok(amount) => amount,
            Err(err) => {
                tracing::warn!(%ledger, error = %err, "ledger unreachable, retrying next tick");
                report.unreachable.push(ledger);
                self.events.publish(&BridgeEvent::LedgerUnreachable {
                    ledger,
                    reason: err.to_string(),
                });
                return;
            }
        };

        let snapshot = BalanceSnapshot {
            ledger,
            account,
            amount,
            observed_at: Utc::now(),
        };
        {
            let mut history = self.history.lock();
            if history.len() >= constants::MONITOR_HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(snapshot.clone());
        }

        let expected = report.expected.for_ledger(ledger);
        match report
            .expected
            .verify(ledger, amount, self.config.drift_tolerance)
        {
            Ok(drift) => {
                tracing::debug!(%ledger, %expected, observed = %amount, %drift, "within tolerance");
            }
            Err(err) => {
                let drift = report.expected.drift(ledger, amount);
                tracing::error!(%ledger, %expected, observed = %amount, %drift, "balance drift detected");
                self.events.publish(&BridgeEvent::DriftDetected {
                    ledger,
                    expected,
                    observed: amount,
                    drift,
                    observed_at: snapshot.observed_at,
                });
                report.errors.push(err);
            }
        }
        report.snapshots.push(snapshot);
    }
}
