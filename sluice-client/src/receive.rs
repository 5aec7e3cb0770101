//! ReceiveMessage

use crate::SqsQueueClient;
use crate::error::{ClientError, Result};
use aws_sdk_sqs::operation::receive_message::builders::ReceiveMessageFluentBuilder;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use sluice_core::{Message, QueueOperation, ReceiveRequest};
use std::collections::HashMap;
use tracing::{debug, warn};

impl SqsQueueClient {
    /// Fetch up to `request.max_messages` messages, long polling for
    /// `request.wait_time_seconds`
    ///
    /// Entries SQS returns without an id or receipt handle cannot be
    /// acknowledged and are dropped with a warning.
    pub async fn receive_messages(&self, request: &ReceiveRequest) -> Result<Vec<Message>> {
        let output = self
            .receive_message_request(request)
            .send()
            .await
            .map_err(|e| ClientError::request(QueueOperation::Receive, &e))?;

        let messages: Vec<Message> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_message)
            .collect();

        debug!(count = messages.len(), queue_url = %request.queue_url, "ReceiveMessage returned");
        Ok(messages)
    }

    /// ReceiveMessage call for `request`
    ///
    /// `attribute_names` filters the message attributes; system attributes
    /// are always requested in full.
    fn receive_message_request(&self, request: &ReceiveRequest) -> ReceiveMessageFluentBuilder {
        let mut req = self
            .client
            .receive_message()
            .queue_url(&request.queue_url)
            .max_number_of_messages(to_i32(request.max_messages))
            .visibility_timeout(to_i32(request.visibility_timeout))
            .wait_time_seconds(to_i32(request.wait_time_seconds))
            .message_system_attribute_names(MessageSystemAttributeName::All);

        for name in &request.attribute_names {
            req = req.message_attribute_names(name);
        }

        req
    }
}

/// Convert an SDK message into the queue-agnostic form
fn into_message(message: aws_sdk_sqs::types::Message) -> Option<Message> {
    let (Some(message_id), Some(receipt_handle)) = (message.message_id, message.receipt_handle)
    else {
        warn!("Dropping SQS message without id or receipt handle");
        return None;
    };

    let attributes = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    // Binary attributes have no string form and are skipped
    let message_attributes: HashMap<String, String> = message
        .message_attributes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.string_value.map(|v| (name, v)))
        .collect();

    Some(Message {
        message_id,
        receipt_handle,
        body: message.body,
        attributes,
        message_attributes,
    })
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
