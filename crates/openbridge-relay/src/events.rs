//! Event sinks.
//!
//! [`BridgeEvent`]s are published synchronously and must never block the
//! caller: sinks buffer or drop, they do not apply back-pressure.

use std::sync::Arc;

use openbridge_types::{BridgeEvent, constants};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Receives structured bridge events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &BridgeEvent);
}

/// Writes every event to `tracing` as a JSON payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &BridgeEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event {
            BridgeEvent::TransferHalted { .. } | BridgeEvent::DriftDetected { .. } => {
                tracing::error!(event = event.kind(), %payload, "bridge event");
            }
            BridgeEvent::TransferFailed { .. }
            | BridgeEvent::TransferRejected { .. }
            | BridgeEvent::TransferInvalid { .. }
            | BridgeEvent::LedgerUnreachable { .. } => {
                tracing::warn!(event = event.kind(), %payload, "bridge event");
            }
            _ => tracing::info!(event = event.kind(), %payload, "bridge event"),
        }
    }
}

/// Fans events out to `tokio` broadcast subscribers. Slow subscribers lag
/// and miss events; publishing never waits.
pub struct BroadcastSink {
    tx: broadcast::Sender<BridgeEvent>,
}

impl BroadcastSink {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(constants::EVENT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &BridgeEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<BridgeEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    /// Event kinds in publication order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(BridgeEvent::kind).collect()
    }

    /// Take and clear the buffered events.
    pub fn drain(&self) -> Vec<BridgeEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &BridgeEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Publishes to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn publish(&self, event: &BridgeEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }
}
