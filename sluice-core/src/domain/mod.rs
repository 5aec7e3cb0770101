//! Core domain types
//!
//! These types are shared between queue client implementations (which build
//! them from the wire) and the poller (which hands them to user handlers).

pub mod message;
