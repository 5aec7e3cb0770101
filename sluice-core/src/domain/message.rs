//! Message domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message received from the queue
///
/// The poller treats messages as opaque records: it only reads the receipt
/// handle to acknowledge them. The body is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(message_id: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Parameters of a single receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Queue to receive from
    pub queue_url: String,

    /// Upper bound on the number of messages returned
    pub max_messages: u32,

    /// Message attribute names to request ("All" requests every one)
    pub attribute_names: Vec<String>,

    /// Seconds the received messages stay hidden from other consumers
    pub visibility_timeout: u32,

    /// Long-polling wait in seconds
    pub wait_time_seconds: u32,
}
