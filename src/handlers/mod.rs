//! Event handlers.
//!
//! The dispatcher receives every inbound message, in order, after the
//! tracker and pending expectations have seen it, and routes it:
//!
//! - our own `JOIN` → [`reconcile`] (runs inline; later events queue)
//! - channel `MODE` → [`mode`], which may spawn an [`enforce`] batch
//! - `PRIVMSG` → [`comment`]
//!
//! Handler failures are logged and never stop the dispatcher.

pub mod comment;
mod context;
pub mod enforce;
pub mod mode;
pub mod privilege;
pub mod reconcile;
#[cfg(test)]
pub(crate) mod testing;

pub use context::{Context, WatchedModes};

use std::sync::Arc;

use bantracker_proto::Message;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::HandlerError;
use crate::network::Session;

/// Process events until the connection closes.
pub async fn dispatch(ctx: Arc<Context>, session: Session, mut events: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = events.recv().await {
        if let Err(e) = route(&ctx, &session, &msg).await {
            match &e {
                HandlerError::Store(_) => {
                    error!(command = %msg.command, error = %e, code = e.error_code(), "Handler failed")
                }
                HandlerError::Session(_) => {
                    warn!(command = %msg.command, error = %e, code = e.error_code(), "Handler interrupted")
                }
            }
        }
    }
    debug!("Dispatcher finished");
}

async fn route(ctx: &Arc<Context>, session: &Session, msg: &Message) -> Result<(), HandlerError> {
    match msg.command.as_str() {
        "JOIN" => {
            let own_join = msg
                .source_nickname()
                .is_some_and(|nick| session.tracker().is_me(nick));
            match msg.param(0) {
                Some(channel) if own_join => reconcile::on_self_join(ctx, session, channel).await,
                _ => Ok(()),
            }
        }
        "MODE" => mode::on_mode(ctx, session, msg).await,
        "PRIVMSG" => comment::on_privmsg(ctx, session, msg).await,
        _ => Ok(()),
    }
}
