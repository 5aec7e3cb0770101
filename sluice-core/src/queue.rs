//! Queue client capability
//!
//! The poller never talks to a queue directly. It goes through this trait so
//! that the transport (SQS, an emulator, an in-memory mock) stays swappable.

use async_trait::async_trait;

use crate::domain::message::{Message, ReceiveRequest};
use crate::error::TransportError;

/// Receive and acknowledge operations against a remote queue
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receives up to `request.max_messages` messages
    ///
    /// May return an empty vector when the long-poll wait elapses with
    /// nothing to deliver.
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<Message>, TransportError>;

    /// Acknowledges a single message by its receipt handle
    async fn delete(&self, queue_url: &str, message: &Message) -> Result<(), TransportError>;

    /// Acknowledges many messages in one call
    ///
    /// Callers treat this as all-or-nothing: any failure means the whole
    /// batch is considered unacknowledged.
    async fn delete_batch(&self, queue_url: &str, messages: &[Message])
    -> Result<(), TransportError>;
}
