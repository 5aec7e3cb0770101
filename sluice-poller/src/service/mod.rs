//! Service layer
//!
//! Services are the caller-supplied pieces the poller drives: message and
//! batch handlers, the pre-poll hook, and lifecycle observers.
//!
//! All services are trait-based to enable testing and dependency injection.

mod handler;
mod observer;

// Re-export traits
pub use handler::{BatchHandler, BeforePoll, MessageHandler};
pub use observer::PollerObserver;

// Re-export implementations
pub use handler::{DispatchMode, HandlerResult, Handlers};
pub use observer::{
    ERROR_EVENT, EventTarget, NoopObserver, Phase, PollerEvent, Stage, TracingObserver,
};

pub(crate) use handler::Session;
