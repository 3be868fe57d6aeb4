//! Progress push channel.
//!
//! The backend pushes progress over Socket.IO. On the WebSocket transport
//! every text frame is one Engine.IO packet: a type digit followed by its
//! payload. Socket.IO packets ride inside Engine.IO `message` packets, so a
//! progress event arrives as `42["progress_update",{...}]`. There is no
//! "done" event; completion is inferred from the snapshot itself.
//!
//! A [`ProgressTransport`] starts one reader task per connection. The task
//! performs the handshake, answers heartbeats and posts [`SyncEvent`]s
//! tagged with the synchronizer session onto the app's event queue. It never
//! touches app state directly.

use std::fmt;
use std::time::Duration;

use coursecraft_core::ProgressState;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::queue::EventQueue;
use crate::sync::SyncEvent;

// ============================================================================
// Wire Format
// ============================================================================

/// Query string selecting Engine.IO protocol 4 over a raw WebSocket.
pub const ENGINE_IO_QUERY: &str = "EIO=4&transport=websocket";

/// Joins the default namespace; sent after the Engine.IO handshake.
pub const CONNECT_PACKET: &str = "40";

/// Heartbeat reply. The ping payload, if any, is echoed after it.
pub const PONG_PACKET: &str = "3";

/// Name of the event carrying progress snapshots.
pub const PROGRESS_EVENT: &str = "progress_update";

/// Events the backend pushes on the progress channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A full progress snapshot.
    ProgressUpdate(ProgressState),
}

impl ChannelEvent {
    /// Returns the event name as sent on the wire.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::ProgressUpdate(_) => PROGRESS_EVENT,
        }
    }

    /// Encodes the event as a Socket.IO event packet in the default
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Json` if serialization fails.
    pub fn to_frame(&self) -> Result<String> {
        let body = match self {
            Self::ProgressUpdate(state) => serde_json::to_string(&(self.event_name(), state))?,
        };
        Ok(format!("42{body}"))
    }
}

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake. The client joins the namespace next.
    Open,
    /// The namespace join was accepted.
    Joined,
    /// Engine.IO heartbeat with its payload.
    Ping(String),
    /// A `progress_update` event.
    Progress(ProgressState),
    /// Any other event or packet; ignored.
    Ignored(String),
    /// The server refused the namespace join.
    Refused(String),
    /// The server ended the session.
    Closed,
}

#[derive(Deserialize)]
struct ConnectError {
    message: String,
}

fn malformed(what: impl fmt::Display) -> ClientError {
    ClientError::channel(format!("malformed frame: {what}"))
}

/// Decodes a text frame.
///
/// # Errors
///
/// Returns `ClientError::ChannelError` if the frame is not an Engine.IO
/// packet, an event packet is not a JSON array led by the event name, or a
/// `progress_update` payload is not a progress snapshot.
pub fn decode_frame(text: &str) -> Result<Frame> {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Ok(Frame::Open),
        Some('1') => Ok(Frame::Closed),
        Some('2') => Ok(Frame::Ping(chars.as_str().to_string())),
        Some('3') => Ok(Frame::Ignored("pong".to_string())),
        Some('4') => decode_message(chars.as_str()),
        Some('6') => Ok(Frame::Ignored("noop".to_string())),
        Some(_) => Err(malformed(format!("unknown packet type in {text:?}"))),
        None => Err(malformed("empty frame")),
    }
}

/// Decodes the Socket.IO packet inside an Engine.IO `message`.
fn decode_message(body: &str) -> Result<Frame> {
    let mut chars = body.chars();
    let kind = chars.next();
    let rest = strip_namespace(chars.as_str());
    match kind {
        Some('0') => Ok(Frame::Joined),
        Some('1') => Ok(Frame::Closed),
        Some('2') => decode_event(rest),
        Some('4') => {
            let message = serde_json::from_str::<ConnectError>(rest)
                .map_or_else(|_| rest.to_string(), |e| e.message);
            Ok(Frame::Refused(message))
        }
        Some(other) => Ok(Frame::Ignored(format!("socket.io packet {other}"))),
        None => Err(malformed("empty message packet")),
    }
}

/// Drops a leading `/namespace,` if present.
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        rest.split_once(',').map_or("", |(_, tail)| tail)
    } else {
        rest
    }
}

fn decode_event(rest: &str) -> Result<Frame> {
    // An ack id may precede the arguments.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let args: Vec<Value> = serde_json::from_str(rest).map_err(malformed)?;
    let mut args = args.into_iter();
    let Some(Value::String(name)) = args.next() else {
        return Err(malformed("event packet without an event name"));
    };

    if name != PROGRESS_EVENT {
        return Ok(Frame::Ignored(name));
    }

    serde_json::from_value(args.next().unwrap_or(Value::Null))
        .map(Frame::Progress)
        .map_err(|e| ClientError::channel(format!("malformed progress_update payload: {e}")))
}

// ============================================================================
// Transport
// ============================================================================

/// Opens progress channel connections.
pub trait ProgressTransport: fmt::Debug + Send + Sync {
    /// Starts a reader task for `session`.
    ///
    /// The task posts `Connected` once the namespace is joined, then a
    /// `Snapshot` per progress event and `ChannelError` for failures, and
    /// finally `Disconnected` when the connection ends. Aborting the handle
    /// closes the connection.
    fn open(&self, session: u64, queue: EventQueue) -> JoinHandle<()>;
}

/// [`ProgressTransport`] over a WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Creates a transport for the given `ws://` or `wss://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
        }
    }

    /// Creates a transport for the channel described by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.channel_url(), config.connect_timeout())
    }

    /// The channel URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ProgressTransport for WebSocketTransport {
    fn open(&self, session: u64, queue: EventQueue) -> JoinHandle<()> {
        let url = self.url.clone();
        let connect_timeout = self.connect_timeout;
        tokio::spawn(async move {
            read_channel(&url, connect_timeout, session, &queue).await;
            queue.post(SyncEvent::Disconnected { session });
        })
    }
}

/// Connects and forwards frames until the connection ends.
async fn read_channel(url: &str, connect_timeout: Duration, session: u64, queue: &EventQueue) {
    let connect = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url));
    let stream = match connect.await {
        Ok(Ok((stream, _))) => stream,
        Ok(Err(e)) => {
            queue.post(SyncEvent::ChannelError {
                session,
                message: format!("failed to connect to {url}: {e}"),
            });
            return;
        }
        Err(_) => {
            queue.post(SyncEvent::ChannelError {
                session,
                message: format!(
                    "timed out connecting to {url} after {}s",
                    connect_timeout.as_secs()
                ),
            });
            return;
        }
    };

    info!(session, url, "Progress channel connected");

    let (mut sender, mut receiver) = stream.split();
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match decode_frame(&text) {
                Ok(Frame::Open) => {
                    if sender.send(Message::Text(CONNECT_PACKET.to_string())).await.is_err() {
                        debug!(session, "Failed to join namespace, server disconnected");
                        break;
                    }
                }
                Ok(Frame::Joined) => {
                    debug!(session, "Joined progress namespace");
                    queue.post(SyncEvent::Connected { session });
                }
                Ok(Frame::Ping(payload)) => {
                    let pong = format!("{PONG_PACKET}{payload}");
                    if sender.send(Message::Text(pong)).await.is_err() {
                        debug!(session, "Failed to send pong, server disconnected");
                        break;
                    }
                }
                Ok(Frame::Progress(state)) => {
                    if !queue.post(SyncEvent::Snapshot { session, state }) {
                        break;
                    }
                }
                Ok(Frame::Ignored(what)) => {
                    debug!(session, what, "Ignoring channel packet");
                }
                Ok(Frame::Refused(message)) => {
                    warn!(session, %message, "Progress namespace refused");
                    queue.post(SyncEvent::ChannelError {
                        session,
                        message: format!("connection refused: {message}"),
                    });
                    break;
                }
                Ok(Frame::Closed) => {
                    info!(session, "Server ended the progress session");
                    break;
                }
                Err(e) => {
                    warn!(session, error = %e, "Undecodable channel frame");
                    queue.post(SyncEvent::ChannelError {
                        session,
                        message: e.to_string(),
                    });
                }
            },
            Ok(Message::Ping(data)) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    debug!(session, "Failed to send pong, server disconnected");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(session, "Server closed the progress channel");
                break;
            }
            Ok(_) => {
                debug!(session, "Ignoring binary frame");
            }
            Err(e) => {
                warn!(session, error = %e, "Progress channel read failed");
                queue.post(SyncEvent::ChannelError {
                    session,
                    message: e.to_string(),
                });
                break;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
