//! Per-session state and the relay worker.
//!
//! A session owns two bounded queues. Push callers feed the inbound queue and
//! the worker writes it to the remote socket; the worker feeds everything it
//! reads from the socket into the outbound queue for pull callers.
//!
//! ```text
//!  push ──► commands ──► worker ──► remote socket
//!  pull ◄── responses ◄── worker ◄── remote socket
//! ```

use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};

use burrow_types::SessionId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::{TunnelError, TunnelResult};

/// Bytes the client wants written to the remote socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Payload to write.
    Data(Vec<u8>),
}

/// Something the worker observed on the remote socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Bytes read from the socket.
    Data(Vec<u8>),
    /// The socket is gone; emitted once, always last.
    Quit(String),
}

/// Reason reported when the remote side closes cleanly.
pub const REMOTE_CLOSED: &str = "EOF";

/// A live tunnel to one remote endpoint.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    account: String,
    remote: String,
    commands: mpsc::Sender<Command>,
    responses: Mutex<mpsc::Receiver<Response>>,
    created_at: Instant,
    closed_at: StdMutex<Option<Instant>>,
}

impl Session {
    /// Create a session around a connected socket and spawn its relay worker.
    ///
    /// `queue_capacity` bounds both queues; `read_buffer_size` bounds a single
    /// data response.
    pub fn start(
        id: SessionId,
        account: &str,
        remote: String,
        stream: TcpStream,
        queue_capacity: usize,
        read_buffer_size: usize,
    ) -> Arc<Self> {
        let (command_tx, command_rx) = mpsc::channel(queue_capacity.max(1));
        let (response_tx, response_rx) = mpsc::channel(queue_capacity.max(1));

        let session = Arc::new(Self {
            id,
            account: account.to_string(),
            remote,
            commands: command_tx,
            responses: Mutex::new(response_rx),
            created_at: Instant::now(),
            closed_at: StdMutex::new(None),
        });

        let worker = RelayWorker {
            session: Arc::downgrade(&session),
            id,
            stream,
            commands: command_rx,
            responses: response_tx,
            read_buffer_size: read_buffer_size.max(1),
        };
        tokio::spawn(worker.run());

        session
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Account that opened the session.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// `host:port` of the remote endpoint.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Time since the session was opened.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the worker has emitted its quit response.
    pub fn is_closed(&self) -> bool {
        self.closed_at().is_some()
    }

    /// When the worker emitted its quit response.
    pub fn closed_at(&self) -> Option<Instant> {
        self.closed_at.lock().map(|guard| *guard).unwrap_or(None)
    }

    /// Queue bytes for the remote socket, waiting while the queue is full.
    pub async fn push(&self, payload: Vec<u8>) -> TunnelResult<()> {
        self.commands
            .send(Command::Data(payload))
            .await
            .map_err(|_| TunnelError::SessionClosed)
    }

    /// Take the next response, waiting until one is available.
    ///
    /// With a timeout, `Ok(None)` means nothing arrived in time. After the
    /// quit response has been taken, further pulls fail with `SessionClosed`.
    pub async fn pull(&self, timeout: Option<Duration>) -> TunnelResult<Option<Response>> {
        let mut responses = self.responses.lock().await;
        let next = match timeout {
            Some(limit) => match tokio::time::timeout(limit, responses.recv()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            },
            None => responses.recv().await,
        };
        next.map(Some).ok_or(TunnelError::SessionClosed)
    }

    fn mark_closed(&self) {
        if let Ok(mut closed_at) = self.closed_at.lock() {
            closed_at.get_or_insert_with(Instant::now);
        }
    }
}

/// Moves bytes between one session's queues and its remote socket.
struct RelayWorker {
    // Weak so a reaped session is dropped even while its worker is blocked.
    session: Weak<Session>,
    id: SessionId,
    stream: TcpStream,
    commands: mpsc::Receiver<Command>,
    responses: mpsc::Sender<Response>,
    read_buffer_size: usize,
}

impl RelayWorker {
    async fn run(self) {
        let RelayWorker {
            session,
            id,
            stream,
            commands,
            responses,
            read_buffer_size,
        } = self;

        let (mut reader, writer) = stream.into_split();
        let (write_failed_tx, mut write_failed_rx) = oneshot::channel();
        let drain = tokio::spawn(drain_to_remote(id, writer, commands, write_failed_tx));

        let mut buf = vec![0u8; read_buffer_size];
        let reason = loop {
            tokio::select! {
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break REMOTE_CLOSED.to_string(),
                    Ok(n) => {
                        if responses.send(Response::Data(buf[..n].to_vec())).await.is_err() {
                            // Session was dropped from the table; nobody will pull again.
                            tracing::debug!("Session {} dropped while relaying", id);
                            drain.abort();
                            let _ = drain.await;
                            return;
                        }
                    }
                    Err(e) => break e.to_string(),
                },
                Ok(reason) = &mut write_failed_rx => break reason,
            }
        };

        // Stop writing before reporting, so pushes after the quit fail.
        drain.abort();
        let _ = drain.await;

        tracing::info!("Session {} closed: {}", id, reason);
        if let Some(session) = session.upgrade() {
            session.mark_closed();
        }
        let _ = responses.send(Response::Quit(reason)).await;
    }
}

/// Write queued commands to the remote socket in order.
///
/// Reports the first write error through `failed` and stops.
async fn drain_to_remote(
    id: SessionId,
    mut writer: OwnedWriteHalf,
    mut commands: mpsc::Receiver<Command>,
    failed: oneshot::Sender<String>,
) {
    while let Some(Command::Data(payload)) = commands.recv().await {
        if let Err(e) = writer.write_all(&payload).await {
            tracing::debug!("Session {} write failed: {}", id, e);
            let _ = failed.send(e.to_string());
            return;
        }
    }
    tracing::debug!("Session {} command queue closed", id);
}
