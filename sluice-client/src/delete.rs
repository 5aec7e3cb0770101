//! DeleteMessage and DeleteMessageBatch

use crate::SqsQueueClient;
use crate::error::{ClientError, Result};
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use sluice_core::{Message, QueueOperation};
use tracing::{debug, warn};

/// https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_DeleteMessageBatch.html
const MAX_BATCH_SIZE: usize = 10;

impl SqsQueueClient {
    /// Acknowledge a single message
    pub async fn delete_message(&self, queue_url: &str, message: &Message) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| ClientError::request(QueueOperation::Delete, &e))?;

        debug!(message_id = %message.message_id, "Deleted message");
        Ok(())
    }

    /// Acknowledge a batch of messages
    ///
    /// SQS accepts at most ten entries per call, so larger batches are sent
    /// in chunks. Entries SQS rejects are collected and reported as one
    /// `PartialDelete` error once every chunk has been sent.
    pub async fn delete_messages(&self, queue_url: &str, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut rejected = Vec::new();

        for chunk in messages.chunks(MAX_BATCH_SIZE) {
            let entries = batch_entries(chunk)?;

            let output = self
                .client
                .delete_message_batch()
                .queue_url(queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(|e| ClientError::request(QueueOperation::DeleteBatch, &e))?;

            for failed in output.failed() {
                let message_id = failed
                    .id()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| chunk.get(i))
                    .map_or(failed.id(), |m| m.message_id.as_str());

                warn!(
                    message_id,
                    code = %failed.code(),
                    message = failed.message().unwrap_or("unknown"),
                    "Batch delete entry failed"
                );
                rejected.push(format!("{}: {}", message_id, failed.code()));
            }
        }

        if !rejected.is_empty() {
            return Err(ClientError::PartialDelete {
                failed: rejected.len(),
                total: messages.len(),
                details: rejected.join(", "),
            });
        }

        debug!(count = messages.len(), "Deleted message batch");
        Ok(())
    }
}

/// Entries for one DeleteMessageBatch call, identified by their index in
/// the chunk
fn batch_entries(chunk: &[Message]) -> Result<Vec<DeleteMessageBatchRequestEntry>> {
    chunk
        .iter()
        .enumerate()
        .map(|(i, message)| {
            DeleteMessageBatchRequestEntry::builder()
                .id(i.to_string())
                .receipt_handle(&message.receipt_handle)
                .build()
                .map_err(|e| ClientError::InvalidRequest(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_entries_are_indexed() {
        let chunk = vec![Message::new("m1", "r1"), Message::new("m2", "r2")];

        let entries = batch_entries(&chunk).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "0");
        assert_eq!(entries[0].receipt_handle(), "r1");
        assert_eq!(entries[1].id(), "1");
        assert_eq!(entries[1].receipt_handle(), "r2");
    }

    #[test]
    fn test_batches_split_at_ten() {
        let messages: Vec<Message> = (0..23)
            .map(|i| Message::new(format!("m{}", i), format!("r{}", i)))
            .collect();

        let sizes: Vec<usize> = messages.chunks(MAX_BATCH_SIZE).map(<[Message]>::len).collect();

        assert_eq!(sizes, vec![10, 10, 3]);
    }
}
