//! Error types for the poller

use sluice_core::{BoxError, TransportError};
use thiserror::Error;

/// Result type alias for poller operations
pub type Result<T> = std::result::Result<T, PollerError>;

/// Errors raised by the poller
///
/// `Configuration`, `Handler`, `AlreadyRunning` and `Runtime` are returned
/// synchronously from construction and `start`/`resume`. The remaining
/// variants only ever reach callers as error events while the loop runs.
#[derive(Debug, Error)]
pub enum PollerError {
    /// Invalid or missing option at construction
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing or conflicting handler wiring
    #[error("handler error: {0}")]
    Handler(String),

    /// `start` called on a running poller
    #[error("poller is already running")]
    AlreadyRunning,

    /// No Tokio runtime to spawn the poll loop onto
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Receive, delete or delete-batch failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A handler or the pre-poll hook returned an error
    #[error("processing failed: {source}")]
    Processing {
        #[source]
        source: BoxError,
    },

    /// A handler panicked
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl PollerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    pub fn processing(source: impl Into<BoxError>) -> Self {
        Self::Processing {
            source: source.into(),
        }
    }

    /// Check if this error is fatal to construction or startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Handler(_) | Self::AlreadyRunning | Self::Runtime(_)
        )
    }

    /// The transport error, if this error came from the queue client
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(PollerError::configuration("queue_url is a required option").is_fatal());
        assert!(PollerError::handler("each_message or each_batch is required").is_fatal());
        assert!(PollerError::AlreadyRunning.is_fatal());
        assert!(!PollerError::processing("boom").is_fatal());
        assert!(!PollerError::from(TransportError::receive("reset")).is_fatal());
    }

    #[test]
    fn test_transport_is_transparent() {
        let err = PollerError::from(TransportError::delete("stale receipt handle"));
        assert_eq!(err.to_string(), "queue delete failed: stale receipt handle");
        assert!(err.as_transport().is_some());
        assert!(PollerError::processing("boom").as_transport().is_none());
    }
}
