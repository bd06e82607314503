//! Network module.
//!
//! Contains the Connection driver, the Session handle handlers use to talk to
//! the server, and the expectation registry behind `Session::expect`.

mod connection;
mod session;
mod waiters;

pub use connection::Connection;
pub use session::Session;
