//! State management module.
//!
//! Per-connection view of channels, members and server parameters, shared
//! between the reader task (writer) and handlers (readers).

mod channel;
mod tracker;
mod user;

pub use tracker::Tracker;
