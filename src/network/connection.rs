//! Connection - Drives one connection to the IRC server.
//!
//! ```text
//! Phase 1: Registration (sequential, unthrottled)
//!    PASS? / CAP LS / NICK / USER ... CAP END ... 001
//!    ↓
//! Phase 2: Steady state
//!    ┌───────────────┐  Message   ┌────────────┐   ┌──────────┐
//!    │  read loop    │──────────▶│ dispatcher │──▶│ handlers │
//!    │ tracker.apply │            └────────────┘   └────┬─────┘
//!    │ waiters.offer │                                  │ Session::send
//!    └───────────────┘   ┌──────────────────────────┐   │
//!                        │ writer (governor bucket) │◀──┘
//!                        └──────────────────────────┘
//! ```
//!
//! The read loop updates the tracker and wakes expectations before the
//! dispatcher sees a line, so a handler resumed by a reply already observes
//! the state that reply implies.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use bantracker_proto::{
    HandshakeAction, HandshakeConfig, HandshakeError, HandshakeMachine, IrcCodec, Message,
    ProtocolError, SaslCredentials,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, trace, warn};

use super::session::Session;
use super::waiters::Waiters;
use crate::config::{LimitsConfig, ServerConfig};
use crate::error::ConnectionError;
use crate::handlers::{self, Context};
use crate::state::Tracker;

type Writer = SplitSink<Framed<TcpStream, IrcCodec>, Message>;
type Reader = SplitStream<Framed<TcpStream, IrcCodec>>;

/// Registration must finish within this window.
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Channels per JOIN line.
const JOIN_BATCH: usize = 10;

/// Capabilities requested whenever the server offers them.
const WANTED_CAPS: [&str; 2] = ["multi-prefix", "userhost-in-names"];

/// One connection to the server.
pub struct Connection {
    ctx: Arc<Context>,
}

impl Connection {
    /// Create a connection handler. Nothing happens until [`Connection::run`].
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Connect, register, join channels and process lines until the server
    /// goes away.
    #[instrument(skip(self), fields(host = %self.ctx.config.server.host, port = self.ctx.config.server.port), name = "connection")]
    pub async fn run(self) -> Result<(), ConnectionError> {
        let server = &self.ctx.config.server;
        let stream = TcpStream::connect((server.host.as_str(), server.port)).await?;
        info!("Connected");

        let (mut writer, mut reader) = Framed::new(stream, IrcCodec::new()).split();
        let mut tracker = Tracker::new(&server.nick);
        for (_, letter) in self.ctx.watched().letters() {
            tracker.assume_list_mode(letter);
        }
        let tracker = Arc::new(RwLock::new(tracker));

        // Phase 1: Registration
        let nick = tokio::time::timeout(
            REGISTRATION_TIMEOUT,
            register(server, &mut writer, &mut reader, &tracker),
        )
        .await
        .map_err(|_| ConnectionError::RegistrationTimeout)??;
        info!(nick = %nick, "Registered");

        // Phase 2: Steady state
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let waiters = Arc::new(Waiters::default());
        let session = Session::new(outgoing_tx, Arc::clone(&waiters), Arc::clone(&tracker));

        let write_task = tokio::spawn(write_loop(
            writer,
            outgoing_rx,
            outbound_limiter(&self.ctx.config.limits),
        ));

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let dispatch_task = tokio::spawn(handlers::dispatch(
            Arc::clone(&self.ctx),
            session.clone(),
            event_rx,
        ));

        self.ctx.set_session(Some(session.clone()));

        let result = match join_channels(&session, &self.ctx.config.bot.channels) {
            Ok(()) => read_loop(&mut reader, &tracker, &waiters, &session, &event_tx).await,
            Err(_) => Err(ConnectionError::Closed),
        };

        // Teardown: pending expectations fail with Disconnected, the
        // dispatcher drains what it already has and exits.
        self.ctx.set_session(None);
        waiters.close();
        drop(event_tx);
        write_task.abort();
        if let Err(e) = dispatch_task.await {
            warn!(error = %e, "Dispatcher task failed");
        }

        info!("Disconnected");
        result
    }
}

/// Run the registration state machine until `001`. Returns the nickname
/// the server accepted.
async fn register(
    server: &ServerConfig,
    writer: &mut Writer,
    reader: &mut Reader,
    tracker: &RwLock<Tracker>,
) -> Result<String, ConnectionError> {
    let mut machine = HandshakeMachine::new(handshake_config(server));
    for action in machine.start() {
        if let HandshakeAction::Send(msg) = action {
            send_now(writer, *msg).await?;
        }
    }

    while let Some(line) = reader.next().await {
        let Some(msg) = parse_inbound(&line?) else {
            continue;
        };
        tracker.write().apply(&msg);

        if msg.command == "PING" {
            send_now(writer, Message::pong(msg.param(0).unwrap_or_default())).await?;
            continue;
        }

        let mut complete = false;
        for action in machine.feed(&msg) {
            match action {
                HandshakeAction::Send(reply) => send_now(writer, *reply).await?,
                HandshakeAction::Complete => complete = true,
                HandshakeAction::Error(e @ HandshakeError::ServerError(_)) => return Err(e.into()),
                HandshakeAction::Error(e) => warn!(error = %e, "Registration problem"),
            }
        }
        if complete {
            return Ok(machine.nickname().to_string());
        }
    }

    Err(ConnectionError::Closed)
}

fn handshake_config(server: &ServerConfig) -> HandshakeConfig {
    let mut request_caps: Vec<String> = WANTED_CAPS.iter().map(|c| c.to_string()).collect();
    if server.sasl.is_some() {
        request_caps.push("sasl".to_string());
    }

    HandshakeConfig {
        nickname: server.nick.clone(),
        username: server.username().to_string(),
        realname: server.realname.clone(),
        password: server.password.clone(),
        request_caps,
        sasl_credentials: server.sasl.as_ref().map(|sasl| SaslCredentials {
            account: sasl.account.clone(),
            password: sasl.password.clone(),
        }),
    }
}

fn join_channels(session: &Session, channels: &[String]) -> Result<(), crate::error::SessionError> {
    for batch in channels.chunks(JOIN_BATCH) {
        session.send(Message::join(batch))?;
    }
    Ok(())
}

async fn read_loop(
    reader: &mut Reader,
    tracker: &RwLock<Tracker>,
    waiters: &Waiters,
    session: &Session,
    events: &mpsc::UnboundedSender<Message>,
) -> Result<(), ConnectionError> {
    while let Some(line) = reader.next().await {
        let Some(msg) = parse_inbound(&line?) else {
            continue;
        };

        match msg.command.as_str() {
            "PING" => {
                session
                    .send(Message::pong(msg.param(0).unwrap_or_default()))
                    .map_err(|_| ConnectionError::Closed)?;
                continue;
            }
            "ERROR" => {
                warn!(reason = msg.param(0).unwrap_or_default(), "Server sent ERROR");
            }
            _ => {}
        }

        tracker.write().apply(&msg);
        waiters.offer(&msg);
        if events.send(msg).is_err() {
            warn!("Dispatcher gone, closing connection");
            return Err(ConnectionError::Closed);
        }
    }

    Ok(())
}

async fn write_loop(
    mut writer: Writer,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    limiter: DefaultDirectRateLimiter,
) {
    while let Some(msg) = outgoing.recv().await {
        limiter.until_ready().await;
        trace!(">> {}", msg);
        match writer.send(msg).await {
            Ok(()) => {}
            Err(e @ ProtocolError::MessageTooLong { .. }) => {
                warn!(error = %e, "Dropping outbound line");
            }
            Err(e) => {
                warn!(error = %e, "Write error");
                break;
            }
        }
    }
}

async fn send_now(writer: &mut Writer, msg: Message) -> Result<(), ProtocolError> {
    trace!(">> {}", msg);
    writer.send(msg).await
}

/// Parse one inbound line, logging and skipping anything malformed.
fn parse_inbound(line: &str) -> Option<Message> {
    trace!("<< {}", line);
    match line.parse::<Message>() {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!(line = %line, error = %e, "Ignoring malformed line");
            None
        }
    }
}

/// Token bucket for outbound lines.
fn outbound_limiter(limits: &LimitsConfig) -> DefaultDirectRateLimiter {
    let rate = NonZeroU32::new(limits.lines_per_second).unwrap_or(nonzero!(2u32));
    let burst = NonZeroU32::new(limits.burst).unwrap_or(nonzero!(5u32));
    RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))
}
