//! Integration test common infrastructure.
//!
//! The bot under test is the real binary. Tests play the IRC server: they
//! accept the bot's connection on a [`FakeNetwork`] and script replies over
//! the resulting [`BotLink`].

pub mod bot;
pub mod network;

#[allow(unused_imports)]
pub use bot::TestBot;
#[allow(unused_imports)]
pub use network::{BotLink, FakeNetwork};
