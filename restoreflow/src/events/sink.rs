//! Event sink trait and implementations.

use super::WorkflowEvent;
use async_trait::async_trait;
use tracing::{debug, info, warn, Level};

/// Receives workflow lifecycle events.
///
/// Sinks are injected into the orchestrator. `emit` cannot fail.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Emits an event.
    async fn emit(&self, event: &WorkflowEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &WorkflowEvent) {}
}

/// An event sink that logs events using the tracing framework.
///
/// Failure events are always logged at WARN.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &WorkflowEvent) {
        let event_type = event.event_type();
        let run_id = event.run_id();
        let data = event.to_data();

        if event.is_failure() {
            warn!(event_type, %run_id, event_data = %data, "Event: {}", event_type);
        } else if self.level == Level::DEBUG {
            debug!(event_type, %run_id, event_data = %data, "Event: {}", event_type);
        } else {
            info!(event_type, %run_id, event_data = %data, "Event: {}", event_type);
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &WorkflowEvent) {
        self.log_event(event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<WorkflowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.read().clone()
    }

    /// Returns the types of the collected events, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(WorkflowEvent::event_type).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<WorkflowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &WorkflowEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageId;
    use uuid::Uuid;

    fn stage_events(run_id: Uuid) -> Vec<WorkflowEvent> {
        vec![
            WorkflowEvent::StageStarted {
                run_id,
                stage: StageId::Vision,
            },
            WorkflowEvent::StageCompleted {
                run_id,
                stage: StageId::Vision,
                duration_ms: 12,
            },
            WorkflowEvent::WorkflowFailed {
                run_id,
                stage: StageId::Historical,
                error: "timeout".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_noop_and_logging_sinks() {
        let run_id = Uuid::new_v4();
        for event in stage_events(run_id) {
            NoOpEventSink.emit(&event).await;
            LoggingEventSink::default().emit(&event).await;
            LoggingEventSink::debug().emit(&event).await;
        }
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        for event in stage_events(Uuid::new_v4()) {
            sink.emit(&event).await;
        }

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_types(),
            vec!["stage.started", "stage.completed", "workflow.failed"]
        );
        assert_eq!(sink.events_of_type("stage.").len(), 2);

        sink.clear();
        assert!(sink.is_empty());
    }
}
