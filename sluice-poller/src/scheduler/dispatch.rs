//! One poll iteration
//!
//! Fetch, dispatch to the session's handlers, acknowledge. Failures of a
//! single message or batch are published as error events and never abort the
//! iteration's sibling work.

use sluice_core::Message;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use super::poller::Shared;
use super::state::InFlight;
use crate::error::{PollerError, Result};
use crate::service::{
    BatchHandler, DispatchMode, EventTarget, MessageHandler, PollerEvent, Session, Stage,
};

impl Shared {
    /// Runs a single iteration, publishing any failure as an error event
    pub(super) async fn poll(self: Arc<Self>) {
        let Some(session) = self.session() else {
            warn!("No handlers installed, skipping iteration");
            return;
        };

        if let Err(error) = self.poll_once(&session).await {
            self.emit_error(error);
        }
    }

    async fn poll_once(self: &Arc<Self>, session: &Session) -> Result<()> {
        if let Some(hook) = &session.before_poll {
            hook.before_poll().await.map_err(|source| {
                error!(error = %source, "Pre-poll hook failed, skipping fetch");
                PollerError::processing(source)
            })?;
        }

        let messages = self.receive().await?;
        self.state.record_batch(messages.len());

        if messages.is_empty() {
            debug!("No messages available");
            return Ok(());
        }

        debug!(count = messages.len(), "Received messages");
        let in_flight = InFlight::admit(&self.state, messages.len());

        match &session.mode {
            DispatchMode::PerMessage(handler) => {
                self.dispatch_messages(handler, messages, in_flight).await
            }
            DispatchMode::PerBatch(handler) => {
                self.dispatch_batch(handler.as_ref(), messages, in_flight)
                    .await
            }
        }

        Ok(())
    }

    async fn receive(&self) -> Result<Vec<Message>> {
        self.client.receive(&self.request).await.map_err(|err| {
            error!(queue_url = %self.config.queue_url, error = %err, "Failed to receive messages");
            PollerError::from(err)
        })
    }

    /// Processes every message on its own task and waits for all of them
    async fn dispatch_messages(
        self: &Arc<Self>,
        handler: &Arc<dyn MessageHandler>,
        messages: Vec<Message>,
        in_flight: InFlight,
    ) {
        let mut handles = Vec::with_capacity(messages.len());

        for (message, unit) in messages.into_iter().zip(in_flight.into_units()) {
            let shared = Arc::clone(self);
            let handler = Arc::clone(handler);

            handles.push(tokio::spawn(async move {
                let _unit = unit;
                if let Err(error) = shared.process_message(handler.as_ref(), &message).await {
                    shared.emit_error(error);
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Message task panicked");
                self.emit_error(PollerError::Panicked(panic_message(e)));
            }
        }
    }

    async fn process_message(&self, handler: &dyn MessageHandler, message: &Message) -> Result<()> {
        let target = EventTarget::Message(message);

        self.observe(PollerEvent::start(Stage::EachMessage, target));
        if let Err(source) = handler.handle_message(message.clone()).await {
            error!(message_id = %message.message_id, error = %source, "Message handler failed");
            let error = PollerError::processing(source);
            self.observe(PollerEvent::error(Stage::EachMessage, target, &error));
            return Err(error);
        }
        self.observe(PollerEvent::end(Stage::EachMessage, target));

        self.observe(PollerEvent::start(Stage::DeleteMessage, target));
        if let Err(err) = self.client.delete(&self.config.queue_url, message).await {
            error!(message_id = %message.message_id, error = %err, "Failed to delete message");
            let error = PollerError::from(err);
            self.observe(PollerEvent::error(Stage::DeleteMessage, target, &error));
            return Err(error);
        }
        self.observe(PollerEvent::end(Stage::DeleteMessage, target));

        Ok(())
    }

    /// Processes the whole batch, then deletes it only if the handler succeeded
    async fn dispatch_batch(
        &self,
        handler: &dyn BatchHandler,
        messages: Vec<Message>,
        _in_flight: InFlight,
    ) {
        if let Err(error) = self.process_batch(handler, &messages).await {
            self.emit_error(error);
        }
    }

    async fn process_batch(&self, handler: &dyn BatchHandler, messages: &[Message]) -> Result<()> {
        let target = EventTarget::Batch(messages);

        self.observe(PollerEvent::start(Stage::EachBatch, target));
        if let Err(source) = handler.handle_batch(messages.to_vec()).await {
            error!(batch_size = messages.len(), error = %source, "Batch handler failed");
            let error = PollerError::processing(source);
            self.observe(PollerEvent::error(Stage::EachBatch, target, &error));
            return Err(error);
        }
        self.observe(PollerEvent::end(Stage::EachBatch, target));

        self.observe(PollerEvent::start(Stage::DeleteBatch, target));
        if let Err(err) = self
            .client
            .delete_batch(&self.config.queue_url, messages)
            .await
        {
            error!(batch_size = messages.len(), error = %err, "Failed to delete batch");
            let error = PollerError::from(err);
            self.observe(PollerEvent::error(Stage::DeleteBatch, target, &error));
            return Err(error);
        }
        self.observe(PollerEvent::end(Stage::DeleteBatch, target));

        Ok(())
    }
}

/// Extracts a readable message from a failed task
pub(super) fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }

    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
