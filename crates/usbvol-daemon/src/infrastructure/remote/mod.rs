//! Control connection to HQPlayer Embedded.
//!
//! # How does the session work? (for beginners)
//!
//! The controller must never wait on the network, so [`HqpSession`] is only
//! a thin handle: each [`RemoteSession`] call pushes a command onto a
//! channel and returns at once.  A background task (the "session actor")
//! owns the TCP stream and works through those commands in order:
//!
//! ```text
//!  VolumeController ──cmd──▶ SessionActor ──line──▶ HQPlayer :4321
//!        ▲                        │
//!        └──── SessionEvent ◀─────┘◀──line── responses
//! ```
//!
//! Responses are read line by line, decoded with
//! [`decode_response`](usbvol_core::decode_response), and handed back to
//! the event loop as [`SessionEvent`]s.
//!
//! The actor never reconnects on its own.  When a connect attempt fails or
//! an established connection breaks it reports [`SessionEvent::Error`] and
//! waits; the controller decides when to try again.
//!
//! Requests issued while no connection is open are dropped, including
//! those issued while a connect attempt is still in flight.  The first
//! requests on a fresh connection are therefore the range and state
//! queries the controller sends on [`SessionEvent::Connected`].
//!
//! Incoming bytes are split on `\n` by `LineReader`.  A line that is not
//! valid UTF-8 is decoded lossily and a line longer than
//! [`MAX_LINE_LENGTH`] is discarded; neither closes the connection.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};
use usbvol_core::{decode_response, encode_request, ControlRequest, ControlResponse};

use crate::application::control_volume::{RemoteSession, SessionEvent};

pub mod mock;

/// Default limit on how long a single connect attempt may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Capacity of the session → event loop notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Longest response line accepted from the player, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Work items for the session actor.
#[derive(Debug)]
enum Command {
    Connect { host: String, port: u16 },
    Send(ControlRequest),
}

/// Handle to the background session actor.
///
/// Dropping every handle stops the actor and closes the connection.
#[derive(Debug, Clone)]
pub struct HqpSession {
    commands: mpsc::UnboundedSender<Command>,
}

impl HqpSession {
    /// Spawns the session actor on the current tokio runtime.
    ///
    /// Returns the handle and the receiver on which [`SessionEvent`]s are
    /// delivered.  No connection is attempted until
    /// [`RemoteSession::connect`] is called.
    pub fn spawn(connect_timeout: Duration) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let actor = SessionActor {
            commands: cmd_rx,
            events: event_tx,
            connect_timeout,
            connection: None,
            deferred: None,
        };
        tokio::spawn(actor.run());

        (Self { commands: cmd_tx }, event_rx)
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("session actor has stopped; command discarded");
        }
    }
}

impl RemoteSession for HqpSession {
    fn connect(&self, host: &str, port: u16) {
        self.submit(Command::Connect {
            host: host.to_string(),
            port,
        });
    }

    fn set_volume(&self, db: f64) {
        self.submit(Command::Send(ControlRequest::Volume(db)));
    }

    fn query_range(&self) {
        self.submit(Command::Send(ControlRequest::VolumeRange));
    }

    fn query_state(&self) {
        self.submit(Command::Send(ControlRequest::State));
    }
}

// ── Line reader ───────────────────────────────────────────────────────────────

/// Splits the response stream into lines.
///
/// Partial input is kept in `pending` between calls, so [`Self::next_line`]
/// can be cancelled inside `select!` without losing bytes.
struct LineReader {
    reader: BufReader<OwnedReadHalf>,
    pending: Vec<u8>,
    discarding: bool,
}

impl LineReader {
    fn new(reader: OwnedReadHalf) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            discarding: false,
        }
    }

    /// Returns the next line without its `\n`, or `None` at end of stream.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(None);
            }

            let (used, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            };
            if !self.discarding {
                let body = if complete { &available[..used - 1] } else { available };
                self.pending.extend_from_slice(body);
            }
            self.reader.consume(used);

            if !self.discarding && self.pending.len() > MAX_LINE_LENGTH {
                warn!("response line exceeds {MAX_LINE_LENGTH} bytes, discarding it");
                self.pending.clear();
                self.discarding = true;
            }

            if complete {
                if std::mem::take(&mut self.discarding) {
                    continue;
                }
                return Ok(Some(decode_line(std::mem::take(&mut self.pending))));
            }
        }
    }
}

fn decode_line(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => {
            debug!("response line is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

// ── Session actor ─────────────────────────────────────────────────────────────

/// An open control connection.
struct Connection {
    lines: LineReader,
    writer: OwnedWriteHalf,
    peer: String,
}

/// What woke the actor up.
enum Step {
    Command(Option<Command>),
    Line(io::Result<Option<String>>),
}

struct SessionActor {
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::Sender<SessionEvent>,
    connect_timeout: Duration,
    connection: Option<Connection>,
    /// A connect command found while discarding stale requests.
    deferred: Option<Command>,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            let step = match (self.deferred.take(), self.connection.as_mut()) {
                (Some(command), _) => Step::Command(Some(command)),
                (None, Some(conn)) => tokio::select! {
                    command = self.commands.recv() => Step::Command(command),
                    line = conn.lines.next_line() => Step::Line(line),
                },
                (None, None) => Step::Command(self.commands.recv().await),
            };

            match step {
                Step::Command(None) => break,
                Step::Command(Some(Command::Connect { host, port })) => {
                    self.connect(&host, port).await;
                }
                Step::Command(Some(Command::Send(request))) => self.send(&request).await,
                Step::Line(Ok(Some(line))) => self.dispatch_line(&line).await,
                Step::Line(Ok(None)) => {
                    self.drop_connection("connection closed by HQPlayer").await;
                }
                Step::Line(Err(e)) => {
                    self.drop_connection(&format!("read error: {e}")).await;
                }
            }
        }
        debug!("session actor stopped");
    }

    async fn connect(&mut self, host: &str, port: u16) {
        if let Some(old) = self.connection.take() {
            debug!("replacing connection to {}", old.peer);
        }

        let outcome = self.open(host, port).await;
        self.discard_stale_requests();

        match outcome {
            Ok(connection) => {
                info!("control connection open to {}", connection.peer);
                self.connection = Some(connection);
                self.emit(SessionEvent::Connected).await;
            }
            Err(message) => self.emit(SessionEvent::Error(message)).await,
        }
    }

    async fn open(&self, host: &str, port: u16) -> Result<Connection, String> {
        let peer = format!("{host}:{port}");
        let stream = match time::timeout(self.connect_timeout, TcpStream::connect((host, port))).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(format!("failed to connect to {peer}: {e}")),
            Err(_) => {
                return Err(format!(
                    "timed out connecting to {peer} after {:?}",
                    self.connect_timeout
                ))
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY on {peer}: {e}");
        }

        let (reader, writer) = stream.into_split();
        Ok(Connection {
            lines: LineReader::new(reader),
            writer,
            peer,
        })
    }

    /// Drops every request queued during a connect attempt.  A queued
    /// connect ends the scan and runs next.
    fn discard_stale_requests(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Send(request) => {
                    debug!("request issued while connecting; dropping {request:?}");
                }
                connect @ Command::Connect { .. } => {
                    self.deferred = Some(connect);
                    break;
                }
            }
        }
    }

    async fn send(&mut self, request: &ControlRequest) {
        let Some(conn) = self.connection.as_mut() else {
            debug!("not connected; dropping {request:?}");
            return;
        };

        let line = encode_request(request);
        debug!("→ {}", line.trim_end());
        let written = conn.writer.write_all(line.as_bytes()).await;
        if let Err(e) = written {
            self.drop_connection(&format!("write error: {e}")).await;
        }
    }

    async fn dispatch_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        debug!("← {line}");

        match decode_response(line) {
            Ok(ControlResponse::VolumeRange(range)) => {
                self.emit(SessionEvent::RangeResponse(range)).await;
            }
            Ok(ControlResponse::State(state)) => {
                self.emit(SessionEvent::StateResponse(state)).await;
            }
            Ok(ControlResponse::Other(element)) => debug!("ignoring <{element}> response"),
            Err(e) => warn!("undecodable response from HQPlayer: {e}"),
        }
    }

    async fn drop_connection(&mut self, reason: &str) {
        if let Some(conn) = self.connection.take() {
            info!("control connection to {} lost: {reason}", conn.peer);
        }
        self.emit(SessionEvent::Error(reason.to_string())).await;
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped; notification discarded");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
