//! Sluice Core
//!
//! Core types and abstractions for the Sluice queue consumer.
//!
//! This crate contains:
//! - Domain types: the opaque queue records (`Message`) and receive parameters
//! - The `QueueClient` capability the poller consumes
//! - Transport errors shared by every queue client implementation

pub mod domain;
pub mod error;
pub mod queue;

pub use domain::message::{Message, ReceiveRequest};
pub use error::{BoxError, QueueOperation, TransportError};
pub use queue::QueueClient;
