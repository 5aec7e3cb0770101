//! Error types for the SQS client

use sluice_core::{QueueOperation, TransportError};
use std::fmt::{self, Write};
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to SQS
#[derive(Debug, Error)]
pub enum ClientError {
    /// The SDK call failed (network, credentials, service error)
    #[error("SQS {operation} request failed: {message}")]
    Request {
        operation: QueueOperation,
        /// Flattened error chain of the SDK error
        message: String,
    },

    /// SQS accepted the batch call but rejected some entries
    #[error("{failed} of {total} batch delete entries failed: {details}")]
    PartialDelete {
        failed: usize,
        total: usize,
        details: String,
    },

    /// A request entry could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create a request error from an SDK error, keeping its whole chain
    pub fn request(operation: QueueOperation, err: &dyn std::error::Error) -> Self {
        let mut message = String::new();
        // Writing into a String cannot fail
        let _ = write_chain(&mut message, err);

        Self::Request { operation, message }
    }

    /// The queue operation this error belongs to
    pub fn operation(&self) -> QueueOperation {
        match self {
            Self::Request { operation, .. } => *operation,
            Self::PartialDelete { .. } | Self::InvalidRequest(_) => QueueOperation::DeleteBatch,
        }
    }
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        TransportError::new(err.operation(), err)
    }
}

fn write_chain(s: &mut String, err: &dyn std::error::Error) -> fmt::Result {
    write!(s, "{err}")?;
    if let Some(source) = err.source() {
        write!(s, ": ")?;
        write_chain(s, source)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("dispatch failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("connection refused")]
    struct Inner;

    #[test]
    fn test_request_error_flattens_chain() {
        let err = ClientError::request(QueueOperation::Receive, &Outer(Inner));

        assert_eq!(
            err.to_string(),
            "SQS receive request failed: dispatch failure: connection refused"
        );
        assert_eq!(err.operation(), QueueOperation::Receive);
    }

    #[test]
    fn test_partial_delete_is_a_batch_error() {
        let err = ClientError::PartialDelete {
            failed: 2,
            total: 10,
            details: "1: ReceiptHandleIsInvalid".to_string(),
        };

        assert_eq!(err.operation(), QueueOperation::DeleteBatch);
        assert!(err.to_string().starts_with("2 of 10"));
    }

    #[test]
    fn test_into_transport_error_keeps_source() {
        let err = ClientError::request(QueueOperation::Delete, &Inner);
        let transport = TransportError::from(err);

        assert_eq!(transport.operation(), QueueOperation::Delete);
        assert!(transport.inner().downcast_ref::<ClientError>().is_some());
    }
}
