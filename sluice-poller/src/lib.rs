//! Sluice Poller
//!
//! A queue consumer that repeatedly fetches batches from a [`QueueClient`],
//! hands them to caller-supplied handlers and acknowledges what succeeded.
//!
//! Architecture:
//! - Configuration: options, defaults and validation (`config`)
//! - Services: handlers, the pre-poll hook and lifecycle observers (`service`)
//! - Scheduler: the self-rescheduling poll loop and graceful stop (`scheduler`)
//!
//! Handler, delete and fetch failures never stop the loop. They are published
//! as error events (see [`Poller::subscribe_errors`]) and the affected
//! messages are left on the queue to be redelivered after their visibility
//! timeout.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;

pub use config::{PollerBuilder, PollerConfig};
pub use error::{PollerError, Result};
pub use scheduler::Poller;
pub use service::{
    BatchHandler, BeforePoll, DispatchMode, ERROR_EVENT, EventTarget, HandlerResult, Handlers,
    MessageHandler, NoopObserver, Phase, PollerEvent, PollerObserver, Stage, TracingObserver,
};

pub use sluice_core::{BoxError, Message, QueueClient, ReceiveRequest, TransportError};
