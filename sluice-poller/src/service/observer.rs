//! Lifecycle observers
//!
//! Side-channel diagnostics for the poll loop. The poller asks
//! [`PollerObserver::is_enabled`] before building any event, so an unobserved
//! poller does no extra work per message. Nothing the poller decides depends
//! on an observer.

use sluice_core::Message;
use std::sync::Arc;
use tracing::{Level, debug};

use crate::error::PollerError;

/// Name of the poller-level error event
pub const ERROR_EVENT: &str = "sluice:poller:error";

/// Unit of work an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    EachMessage,
    EachBatch,
    DeleteMessage,
    DeleteBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    End,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub enum EventTarget<'a> {
    Message(&'a Message),
    Batch(&'a [Message]),
}

impl EventTarget<'_> {
    /// Number of messages the event covers
    pub fn len(&self) -> usize {
        match self {
            Self::Message(_) => 1,
            Self::Batch(messages) => messages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A lifecycle event published by the poller
#[derive(Debug, Clone, Copy)]
pub struct PollerEvent<'a> {
    pub stage: Stage,
    pub phase: Phase,
    pub target: EventTarget<'a>,
    /// Set for `Phase::Error` only
    pub error: Option<&'a PollerError>,
}

impl<'a> PollerEvent<'a> {
    pub fn start(stage: Stage, target: EventTarget<'a>) -> Self {
        Self {
            stage,
            phase: Phase::Start,
            target,
            error: None,
        }
    }

    pub fn end(stage: Stage, target: EventTarget<'a>) -> Self {
        Self {
            stage,
            phase: Phase::End,
            target,
            error: None,
        }
    }

    pub fn error(stage: Stage, target: EventTarget<'a>, error: &'a PollerError) -> Self {
        Self {
            stage,
            phase: Phase::Error,
            target,
            error: Some(error),
        }
    }

    /// Stable channel name, e.g. `sluice:poller:each_message:start`
    pub fn name(&self) -> &'static str {
        use Phase::*;
        use Stage::*;

        match (self.stage, self.phase) {
            (EachMessage, Start) => "sluice:poller:each_message:start",
            (EachMessage, End) => "sluice:poller:each_message:end",
            (EachMessage, Error) => "sluice:poller:each_message:error",
            (EachBatch, Start) => "sluice:poller:each_batch:start",
            (EachBatch, End) => "sluice:poller:each_batch:end",
            (EachBatch, Error) => "sluice:poller:each_batch:error",
            (DeleteMessage, Start) => "sluice:poller:delete_message:start",
            (DeleteMessage, End) => "sluice:poller:delete_message:end",
            (DeleteMessage, Error) => "sluice:poller:delete_message:error",
            (DeleteBatch, Start) => "sluice:poller:delete_batch:start",
            (DeleteBatch, End) => "sluice:poller:delete_batch:end",
            (DeleteBatch, Error) => "sluice:poller:delete_batch:error",
        }
    }
}

/// Receives lifecycle events from the poller
///
/// Callbacks run inline on the poller's tasks and must not block.
pub trait PollerObserver: Send + Sync {
    /// Whether events should be built and delivered at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called at the start, end or failure of each unit of work
    fn on_event(&self, event: &PollerEvent<'_>);

    /// Called for every error surfaced by the poller, including
    /// iteration-level failures such as a failed fetch
    fn on_error(&self, _error: &PollerError) {}
}

impl<T: PollerObserver + ?Sized> PollerObserver for Arc<T> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn on_event(&self, event: &PollerEvent<'_>) {
        (**self).on_event(event)
    }

    fn on_error(&self, error: &PollerError) {
        (**self).on_error(error)
    }
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PollerObserver for NoopObserver {
    fn is_enabled(&self) -> bool {
        false
    }

    fn on_event(&self, _event: &PollerEvent<'_>) {}
}

/// Observer that forwards events to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PollerObserver for TracingObserver {
    fn is_enabled(&self) -> bool {
        tracing::enabled!(Level::DEBUG)
    }

    fn on_event(&self, event: &PollerEvent<'_>) {
        match (event.target, event.error) {
            (EventTarget::Message(message), Some(error)) => {
                debug!(event = event.name(), message_id = %message.message_id, %error);
            }
            (EventTarget::Message(message), None) => {
                debug!(event = event.name(), message_id = %message.message_id);
            }
            (EventTarget::Batch(messages), Some(error)) => {
                debug!(event = event.name(), batch_size = messages.len(), %error);
            }
            (EventTarget::Batch(messages), None) => {
                debug!(event = event.name(), batch_size = messages.len());
            }
        }
    }

    fn on_error(&self, error: &PollerError) {
        debug!(event = ERROR_EVENT, %error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let message = Message::new("m1", "r1");
        let target = EventTarget::Message(&message);

        assert_eq!(
            PollerEvent::start(Stage::EachMessage, target).name(),
            "sluice:poller:each_message:start"
        );
        assert_eq!(
            PollerEvent::end(Stage::DeleteMessage, target).name(),
            "sluice:poller:delete_message:end"
        );

        let err = PollerError::processing("boom");
        let batch = [message.clone()];
        let event = PollerEvent::error(Stage::DeleteBatch, EventTarget::Batch(&batch), &err);
        assert_eq!(event.name(), "sluice:poller:delete_batch:error");
        assert_eq!(event.target.len(), 1);
        assert!(event.error.is_some());
    }

    #[test]
    fn test_noop_observer_is_disabled() {
        assert!(!NoopObserver.is_enabled());
    }
}
