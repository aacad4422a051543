//! Progress sink trait and implementations.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};

use crate::core::{StageEvent, ZoneStatus};

/// Receives stage events as a run progresses.
///
/// Implementations must not fail the run: delivery problems are logged and
/// swallowed.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Publishes an event.
    async fn publish(&self, event: StageEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn publish(&self, _event: StageEvent) {}
}

/// A sink that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingProgressSink {
    level: Level,
}

impl Default for LoggingProgressSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingProgressSink {
    /// Creates a logging sink with the given level for non-failure events.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn publish(&self, event: StageEvent) {
        let StageEvent {
            task_id,
            zone,
            status,
            message,
            output_url,
            ..
        } = &event;

        if *status == ZoneStatus::Failed {
            warn!(task_id = %task_id, zone = %zone, status = %status, "{message}");
        } else if self.level == Level::DEBUG {
            debug!(task_id = %task_id, zone = %zone, status = %status, output_url = ?output_url, "{message}");
        } else {
            info!(task_id = %task_id, zone = %zone, status = %status, output_url = ?output_url, "{message}");
        }
    }
}

/// A sink that keeps every event, for tests and inspection.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingProgressSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the events of one task.
    #[must_use]
    pub fn events_for(&self, task_id: &str) -> Vec<StageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn publish(&self, event: StageEvent) {
        self.events.write().push(event);
    }
}

/// Delivers each event to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutProgressSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for FanoutProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutProgressSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutProgressSink {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of downstream sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no downstream sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ProgressSink for FanoutProgressSink {
    async fn publish(&self, event: StageEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.publish(event.clone()).await;
        }
        last.publish(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Zone;

    #[tokio::test]
    async fn test_noop_and_logging_sinks() {
        NoOpProgressSink
            .publish(StageEvent::running("t1", Zone::MarketResearch, "analyzing"))
            .await;
        LoggingProgressSink::debug()
            .publish(StageEvent::failed("t1", Zone::ImageGeneration, "boom"))
            .await;
    }

    #[tokio::test]
    async fn test_collecting_sink_filters_by_task() {
        let sink = CollectingProgressSink::new();
        assert!(sink.is_empty());

        sink.publish(StageEvent::running("a", Zone::MarketResearch, "x")).await;
        sink.publish(StageEvent::running("b", Zone::MarketResearch, "y")).await;
        sink.publish(StageEvent::completed("a", Zone::MarketResearch, "z")).await;

        assert_eq!(sink.len(), 3);
        let events = sink.events_for("a");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].status, ZoneStatus::Completed);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_fanout_delivers_to_every_sink() {
        let first = Arc::new(CollectingProgressSink::new());
        let second = Arc::new(CollectingProgressSink::new());
        let fanout = FanoutProgressSink::new()
            .with_sink(first.clone())
            .with_sink(second.clone());
        assert_eq!(fanout.len(), 2);

        fanout
            .publish(StageEvent::skipped("t", Zone::ImageSynthesis, "no reference"))
            .await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.events()[0].status, ZoneStatus::Skipped);
    }
}
