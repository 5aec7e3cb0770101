//! Message handlers
//!
//! A poller session runs in exactly one dispatch mode: every message is handed
//! to a [`MessageHandler`] on its own, or the whole batch goes to a
//! [`BatchHandler`]. An optional [`BeforePoll`] hook runs before each fetch.
//!
//! Plain async closures implement these traits, so most callers never name
//! them directly.

use async_trait::async_trait;
use sluice_core::{BoxError, Message};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{PollerError, Result};

/// Outcome of a handler invocation
///
/// `Ok` acknowledges the work; any `Err` leaves the message(s) on the queue
/// for redelivery once the visibility timeout expires.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Processes one message at a time
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, message: Message) -> HandlerResult;
}

/// Processes a whole fetched batch at once
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle_batch(&self, messages: Vec<Message>) -> HandlerResult;
}

/// Runs before every fetch
///
/// A failure skips the fetch for that iteration only.
#[async_trait]
pub trait BeforePoll: Send + Sync {
    async fn before_poll(&self) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle_message(&self, message: Message) -> HandlerResult {
        (self)(message).await
    }
}

#[async_trait]
impl<F, Fut> BatchHandler for F
where
    F: Fn(Vec<Message>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle_batch(&self, messages: Vec<Message>) -> HandlerResult {
        (self)(messages).await
    }
}

#[async_trait]
impl<F, Fut> BeforePoll for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn before_poll(&self) -> HandlerResult {
        (self)().await
    }
}

/// How fetched messages are dispatched during a session
#[derive(Clone)]
pub enum DispatchMode {
    PerMessage(Arc<dyn MessageHandler>),
    PerBatch(Arc<dyn BatchHandler>),
}

impl DispatchMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PerMessage(_) => "each_message",
            Self::PerBatch(_) => "each_batch",
        }
    }
}

impl fmt::Debug for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handlers passed to [`Poller::start`](crate::Poller::start)
///
/// Set exactly one of `each_message` / `each_batch`; `before_poll` is optional.
///
/// ```
/// use sluice_poller::{HandlerResult, Handlers};
///
/// let handlers = Handlers::new()
///     .each_message(|message| async move {
///         println!("received {}", message.message_id);
///         HandlerResult::Ok(())
///     })
///     .before_poll(|| async { HandlerResult::Ok(()) });
/// ```
#[derive(Clone, Default)]
pub struct Handlers {
    each_message: Option<Arc<dyn MessageHandler>>,
    each_batch: Option<Arc<dyn BatchHandler>>,
    before_poll: Option<Arc<dyn BeforePoll>>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles each message independently, deleting it on success
    pub fn each_message<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.message_handler(handler)
    }

    /// Handles each fetched batch at once, deleting all of it on success
    pub fn each_batch<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.batch_handler(handler)
    }

    /// Runs before every fetch
    pub fn before_poll<F, Fut>(self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.before_poll_hook(hook)
    }

    pub fn message_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.each_message = Some(Arc::new(handler));
        self
    }

    pub fn batch_handler(mut self, handler: impl BatchHandler + 'static) -> Self {
        self.each_batch = Some(Arc::new(handler));
        self
    }

    pub fn before_poll_hook(mut self, hook: impl BeforePoll + 'static) -> Self {
        self.before_poll = Some(Arc::new(hook));
        self
    }

    /// Validates the wiring and picks the dispatch mode
    pub(crate) fn into_session(self) -> Result<Session> {
        let mode = match (self.each_message, self.each_batch) {
            (Some(handler), None) => DispatchMode::PerMessage(handler),
            (None, Some(handler)) => DispatchMode::PerBatch(handler),
            (None, None) => {
                return Err(PollerError::handler("each_message or each_batch is required"));
            }
            (Some(_), Some(_)) => {
                return Err(PollerError::handler(
                    "each_message and each_batch are mutually exclusive",
                ));
            }
        };

        Ok(Session {
            mode,
            before_poll: self.before_poll,
        })
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("each_message", &self.each_message.is_some())
            .field("each_batch", &self.each_batch.is_some())
            .field("before_poll", &self.before_poll.is_some())
            .finish()
    }
}

/// Handlers installed for a running session
#[derive(Clone)]
pub(crate) struct Session {
    pub mode: DispatchMode,
    pub before_poll: Option<Arc<dyn BeforePoll>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("before_poll", &self.before_poll.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting;

    #[async_trait]
    impl MessageHandler for Counting {
        async fn handle_message(&self, _message: Message) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_neither_handler_is_rejected() {
        let err = Handlers::new().into_session().unwrap_err();
        assert!(
            matches!(&err, PollerError::Handler(msg) if msg == "each_message or each_batch is required")
        );
    }

    #[test]
    fn test_before_poll_alone_is_rejected() {
        let err = Handlers::new()
            .before_poll(|| async { HandlerResult::Ok(()) })
            .into_session()
            .unwrap_err();
        assert!(matches!(err, PollerError::Handler(_)));
    }

    #[test]
    fn test_both_handlers_are_rejected() {
        let err = Handlers::new()
            .each_message(|_| async { HandlerResult::Ok(()) })
            .each_batch(|_| async { HandlerResult::Ok(()) })
            .into_session()
            .unwrap_err();
        assert!(
            matches!(&err, PollerError::Handler(msg) if msg == "each_message and each_batch are mutually exclusive")
        );
    }

    #[test]
    fn test_dispatch_mode_selection() {
        let session = Handlers::new()
            .each_message(|_| async { HandlerResult::Ok(()) })
            .into_session()
            .unwrap();
        assert_eq!(session.mode.name(), "each_message");
        assert!(session.before_poll.is_none());

        let session = Handlers::new()
            .each_batch(|_| async { HandlerResult::Ok(()) })
            .before_poll(|| async { HandlerResult::Ok(()) })
            .into_session()
            .unwrap();
        assert_eq!(session.mode.name(), "each_batch");
        assert!(session.before_poll.is_some());
    }

    #[test]
    fn test_trait_handler_is_accepted() {
        let session = Handlers::new()
            .message_handler(Counting)
            .into_session()
            .unwrap();
        assert!(matches!(session.mode, DispatchMode::PerMessage(_)));
    }

    #[tokio::test]
    async fn test_closure_handlers_forward_results() {
        let handler = |message: Message| async move {
            if message.message_id == "bad" {
                HandlerResult::Err("rejected".into())
            } else {
                Ok(())
            }
        };

        assert!(handler.handle_message(Message::new("ok", "r1")).await.is_ok());
        let err = handler
            .handle_message(Message::new("bad", "r2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "rejected");
    }
}
