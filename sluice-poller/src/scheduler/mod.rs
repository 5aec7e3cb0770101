//! Scheduler layer for the poller
//!
//! This layer owns the poll loop: fetching batches from the queue client,
//! dispatching them to handlers, acknowledging successes and rescheduling
//! itself until stopped.

mod dispatch;
pub mod poller;
mod state;

pub use poller::Poller;
