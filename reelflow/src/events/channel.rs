//! Channel-backed progress sink for external subscribers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use super::ProgressSink;
use crate::core::StageEvent;

/// Delivery counters of a channel sink.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl DeliveryMetrics {
    fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of events handed to the channel.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of events dropped because the channel was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Forwards events into a bounded channel without blocking the run.
///
/// When the receiver lags behind and the buffer is full, events are
/// dropped and counted.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::Sender<StageEvent>,
    metrics: Arc<DeliveryMetrics>,
}

impl ChannelProgressSink {
    /// Creates a sink and the receiver its events arrive on.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<StageEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            tx,
            metrics: Arc::new(DeliveryMetrics::default()),
        };
        (sink, rx)
    }

    /// Returns the delivery counters.
    #[must_use]
    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }
}

#[async_trait]
impl ProgressSink for ChannelProgressSink {
    async fn publish(&self, event: StageEvent) {
        let task_id = event.task_id.clone();
        let zone = event.zone;
        match self.tx.try_send(event) {
            Ok(()) => self.metrics.record_delivery(),
            Err(err) => {
                self.metrics.record_drop();
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                warn!(
                    task_id = %task_id,
                    zone = %zone,
                    reason,
                    dropped_total = self.metrics.dropped(),
                    "Progress event dropped"
                );
            }
        }
    }
}
