//! Shared fixtures for poller integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sluice_poller::{
    Message, PollerError, PollerEvent, PollerObserver, QueueClient, ReceiveRequest, TransportError,
};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const QUEUE_URL: &str = "https://sqs.us-east-2.amazonaws.com/0000000/test-queue";

/// Stand-in for a connectivity failure raised by a real transport
#[derive(Debug)]
pub struct NetworkError;

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network unreachable")
    }
}

impl std::error::Error for NetworkError {}

enum Fetch {
    Messages(Vec<Message>),
    Fail,
}

/// In-memory queue client
///
/// Queued fetches are served in order; once they run out, `receive` behaves
/// like an idle long poll and returns nothing after `wait_time_seconds`.
#[derive(Default)]
pub struct MockQueueClient {
    fetches: Mutex<VecDeque<Fetch>>,
    receive_calls: AtomicUsize,
    last_request: Mutex<Option<ReceiveRequest>>,
    deleted: Mutex<Vec<String>>,
    deleted_batches: Mutex<Vec<Vec<String>>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_delete_batch: AtomicBool,
}

impl MockQueueClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_messages(&self, messages: Vec<Message>) {
        self.fetches
            .lock()
            .unwrap()
            .push_back(Fetch::Messages(messages));
    }

    pub fn push_failure(&self) {
        self.fetches.lock().unwrap().push_back(Fetch::Fail);
    }

    pub fn fail_delete_for(&self, message_id: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(message_id.to_string());
    }

    pub fn fail_delete_batch(&self) {
        self.fail_delete_batch.store(true, Ordering::SeqCst);
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ReceiveRequest> {
        self.last_request.lock().unwrap().clone()
    }

    /// Receipt handles acknowledged one at a time
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Receipt handles acknowledged per batch call
    pub fn deleted_batches(&self) -> Vec<Vec<String>> {
        self.deleted_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueClient for MockQueueClient {
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<Message>, TransportError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let next = self.fetches.lock().unwrap().pop_front();
        match next {
            Some(Fetch::Messages(messages)) => Ok(messages),
            Some(Fetch::Fail) => Err(TransportError::receive(NetworkError)),
            None => {
                tokio::time::sleep(Duration::from_secs(u64::from(
                    request.wait_time_seconds.max(1),
                )))
                .await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, _queue_url: &str, message: &Message) -> Result<(), TransportError> {
        if self
            .failing_deletes
            .lock()
            .unwrap()
            .contains(&message.message_id)
        {
            return Err(TransportError::delete("receipt handle is invalid"));
        }

        self.deleted
            .lock()
            .unwrap()
            .push(message.receipt_handle.clone());
        Ok(())
    }

    async fn delete_batch(
        &self,
        _queue_url: &str,
        messages: &[Message],
    ) -> Result<(), TransportError> {
        if self.fail_delete_batch.load(Ordering::SeqCst) {
            return Err(TransportError::delete_batch(NetworkError));
        }

        self.deleted_batches.lock().unwrap().push(
            messages
                .iter()
                .map(|message| message.receipt_handle.clone())
                .collect(),
        );
        Ok(())
    }
}

/// Observer that records event names
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    errors: AtomicUsize,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl PollerObserver for RecordingObserver {
    fn on_event(&self, event: &PollerEvent<'_>) {
        self.events.lock().unwrap().push(event.name().to_string());
    }

    fn on_error(&self, _error: &PollerError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

/// Messages `m1..=mN` with receipt handles `r1..=rN`
pub fn messages(count: usize) -> Vec<Message> {
    (1..=count)
        .map(|i| Message::new(format!("m{}", i), format!("r{}", i)).with_body("{\"foo\":\"bar\"}"))
        .collect()
}

/// Polls `condition` every 10ms of (paused) time, panicking after a minute
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);

    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 60s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Collects every error event published so far
pub fn drain_errors(
    errors: &mut tokio::sync::broadcast::Receiver<Arc<PollerError>>,
) -> Vec<Arc<PollerError>> {
    let mut drained = Vec::new();
    while let Ok(error) = errors.try_recv() {
        drained.push(error);
    }
    drained
}
