//! Error types shared by queue client implementations

use std::fmt;
use thiserror::Error;

/// Boxed error returned by handlers and carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Queue operation that produced a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOperation {
    Receive,
    Delete,
    DeleteBatch,
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => write!(f, "receive"),
            Self::Delete => write!(f, "delete"),
            Self::DeleteBatch => write!(f, "delete batch"),
        }
    }
}

/// Failure of a receive, delete or delete-batch call
///
/// The originating error is kept as the `source` so callers can downcast it.
#[derive(Debug, Error)]
#[error("queue {operation} failed: {source}")]
pub struct TransportError {
    operation: QueueOperation,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(operation: QueueOperation, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    pub fn receive(source: impl Into<BoxError>) -> Self {
        Self::new(QueueOperation::Receive, source)
    }

    pub fn delete(source: impl Into<BoxError>) -> Self {
        Self::new(QueueOperation::Delete, source)
    }

    pub fn delete_batch(source: impl Into<BoxError>) -> Self {
        Self::new(QueueOperation::DeleteBatch, source)
    }

    /// The operation that failed
    pub fn operation(&self) -> QueueOperation {
        self.operation
    }

    /// The originating error
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct NetworkError;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::receive("timed out");
        assert_eq!(err.to_string(), "queue receive failed: timed out");
        assert_eq!(err.operation(), QueueOperation::Receive);

        let err = TransportError::delete_batch("throttled");
        assert_eq!(err.to_string(), "queue delete batch failed: throttled");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = TransportError::delete(NetworkError);

        assert!(err.inner().downcast_ref::<NetworkError>().is_some());
        assert!(
            err.source()
                .and_then(|source| source.downcast_ref::<NetworkError>())
                .is_some()
        );
    }
}
