//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: top-level `Config`, connection and database sections
//! - [`bot`]: channel behaviour (trigger, enforcement, quiet letter, timeouts) and expiry
//! - [`limits`]: outbound flood control
//! - [`validation`]: startup checks that report every problem at once

mod bot;
mod limits;
mod types;
mod validation;

pub use limits::LimitsConfig;
pub use types::{Config, ServerConfig};
pub use validation::validate;
