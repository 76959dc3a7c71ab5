//! ConnectionManager - one TCP client with a single-flight writer task
//!
//! The listener accepts clients on a tokio task. Every accepted connection
//! gets its own writer task fed by a channel of capacity 1, plus an
//! in-flight flag that admits one message at a time. A new connection
//! replaces the current one; the old writer finishes any pending write and
//! then shuts its socket down.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{parse_service, ReleasePolicy};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::control::StreamingControl;
use crate::metrics::StreamerMetrics;
use crate::StreamerError;

/// At most one message sits between `submit` and the socket
const WRITER_QUEUE_CAPACITY: usize = 1;

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Time a closing writer gets to flush on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NoSocket,
    ConnectedIdle,
    WriteInProgress,
}

/// Why a write could not begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteRefused {
    #[error("no client connected")]
    NoConnection,
    #[error("a write is already in flight")]
    InProgress,
}

/// Connection currently installed
struct ActiveConnection {
    id: u64,
    peer: SocketAddr,
    tx: mpsc::Sender<Bytes>,
    in_flight: Arc<AtomicBool>,
    writer: Option<JoinHandle<()>>,
    peer_watch: Option<JoinHandle<()>>,
}

impl ActiveConnection {
    fn is_usable(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        // The writer drains on its own once `tx` is gone
        if let Some(peer_watch) = self.peer_watch.take() {
            peer_watch.abort();
        }
    }
}

/// State shared with the accept loop and the per-connection tasks
struct Shared {
    current: Mutex<Option<ActiveConnection>>,
    next_id: AtomicU64,
    release_policy: ReleasePolicy,
    control: StreamingControl,
    metrics: Arc<StreamerMetrics>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept_stream(self: &Arc<Self>, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to disable Nagle");
        }
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                warn!(error = %e, "accepted socket has no peer address, dropping it");
                return;
            }
        };

        let (reader, writer) = stream.into_split();
        self.install(peer, writer, Some(reader));
    }

    /// Install a new connection, replacing the current one
    fn install<W>(self: &Arc<Self>, peer: SocketAddr, writer: W, reader: Option<OwnedReadHalf>) -> u64
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(WRITER_QUEUE_CAPACITY);
        let in_flight = Arc::new(AtomicBool::new(false));
        let ctx = WriterContext {
            id,
            peer,
            in_flight: Arc::clone(&in_flight),
            release_policy: self.release_policy,
            metrics: Arc::clone(&self.metrics),
            shared: Arc::downgrade(self),
        };

        let previous = {
            let mut current = self.lock();
            let writer = tokio::spawn(connection_writer(writer, rx, ctx));
            let peer_watch =
                reader.map(|reader| tokio::spawn(watch_peer(reader, id, Arc::downgrade(self))));
            current.replace(ActiveConnection {
                id,
                peer,
                tx,
                in_flight,
                writer: Some(writer),
                peer_watch,
            })
        };

        self.control.enable();
        self.metrics.inc_connection_accepted();
        observability::record_connection_event("accepted");

        if let Some(old) = previous {
            info!(old_peer = %old.peer, new_peer = %peer, "replacing client connection");
            observability::record_connection_event("replaced");
        }
        info!(peer = %peer, connection_id = id, "client connected");

        id
    }

    /// Drop the connection if `id` is still the current one
    fn drop_connection(&self, id: u64, event: &'static str) -> bool {
        let removed = {
            let mut current = self.lock();
            if current.as_ref().is_some_and(|c| c.id == id) {
                current.take()
            } else {
                None
            }
        };

        match removed {
            Some(conn) => {
                info!(peer = %conn.peer, connection_id = id, event, "client connection dropped");
                observability::record_connection_event(event);
                true
            }
            None => false,
        }
    }
}

/// Listener bookkeeping
struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the listening socket and the single active client
pub struct ConnectionManager {
    service: String,
    shared: Arc<Shared>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl ConnectionManager {
    pub fn new(
        service: impl Into<String>,
        release_policy: ReleasePolicy,
        control: StreamingControl,
        metrics: Arc<StreamerMetrics>,
    ) -> Self {
        Self {
            service: service.into(),
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                next_id: AtomicU64::new(0),
                release_policy,
                control,
                metrics,
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Bind the listener and start accepting clients
    ///
    /// A bind failure is logged once and returned; there is no retry.
    #[instrument(name = "connection_manager_start", skip(self), fields(service = %self.service))]
    pub async fn start(&self) -> Result<SocketAddr, StreamerError> {
        if let Some(addr) = self.local_addr() {
            return Err(StreamerError::AlreadyStarted(addr));
        }

        let addr = parse_service(&self.service).map_err(|e| {
            error!(error = %e, "invalid service");
            StreamerError::invalid_service(&self.service, e.to_string())
        })?;

        let listener = TcpListener::bind(addr).await.map_err(|source| {
            error!(addr = %addr, error = %source, "failed to bind listener");
            StreamerError::Bind {
                service: self.service.clone(),
                source,
            }
        })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.shared), shutdown_rx));

        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.as_ref() {
            task.abort();
            return Err(StreamerError::AlreadyStarted(running.local_addr));
        }
        *slot = Some(ListenerHandle {
            local_addr,
            shutdown_tx,
            task,
        });

        info!(addr = %local_addr, "listening for client");
        Ok(local_addr)
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|l| l.local_addr)
    }

    pub fn is_listening(&self) -> bool {
        self.local_addr().is_some()
    }

    /// Install an accepted TCP client, replacing the current one
    pub fn accept_connection(&self, stream: TcpStream) {
        self.shared.accept_stream(stream);
    }

    /// Install any byte sink as the client connection
    ///
    /// Must be called inside a tokio runtime.
    pub fn attach_writer<W>(&self, peer: SocketAddr, writer: W)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.shared.install(peer, writer, None);
    }

    /// A client is installed and its writer is alive
    pub fn has_usable_connection(&self) -> bool {
        self.shared.lock().as_ref().is_some_and(ActiveConnection::is_usable)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared
            .lock()
            .as_ref()
            .filter(|c| c.is_usable())
            .map(|c| c.peer)
    }

    pub fn state(&self) -> ConnectionState {
        match self.shared.lock().as_ref() {
            Some(c) if c.is_usable() => {
                if c.in_flight.load(Ordering::Acquire) {
                    ConnectionState::WriteInProgress
                } else {
                    ConnectionState::ConnectedIdle
                }
            }
            _ => ConnectionState::NoSocket,
        }
    }

    /// Claim the single in-flight slot of the current connection
    pub fn try_begin_write(&self) -> Result<WritePermit, WriteRefused> {
        let current = self.shared.lock();
        let conn = current
            .as_ref()
            .filter(|c| c.is_usable())
            .ok_or(WriteRefused::NoConnection)?;

        conn.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WriteRefused::InProgress)?;

        Ok(WritePermit {
            connection_id: conn.id,
            tx: conn.tx.clone(),
            in_flight: Arc::clone(&conn.in_flight),
            armed: true,
        })
    }

    /// Close the current client
    ///
    /// Returns false when no client was connected.
    pub fn disconnect(&self) -> bool {
        let removed = self.shared.lock().take();
        match removed {
            Some(conn) => {
                info!(peer = %conn.peer, connection_id = conn.id, "closing client connection");
                observability::record_connection_event("closed");
                true
            }
            None => false,
        }
    }

    /// Stop accepting, close the client and wait briefly for its writer
    #[instrument(name = "connection_manager_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            if listener.shutdown_tx.send(true).is_err() {
                debug!("accept loop already stopped");
            }
            if let Err(e) = listener.task.await {
                error!(error = ?e, "accept loop panicked");
            }
        }

        let writer = self.shared.lock().as_mut().and_then(|c| c.writer.take());
        self.disconnect();
        if let Some(writer) = writer {
            if tokio::time::timeout(SHUTDOWN_GRACE, writer).await.is_err() {
                warn!("writer did not finish within the shutdown grace period");
            }
        }

        debug!("ConnectionManager shutdown complete");
    }
}

/// Exclusive right to submit one message on a connection
///
/// Dropping an unused permit releases the in-flight flag.
pub struct WritePermit {
    connection_id: u64,
    tx: mpsc::Sender<Bytes>,
    in_flight: Arc<AtomicBool>,
    armed: bool,
}

impl WritePermit {
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Hand `message` to the writer task without waiting
    ///
    /// On success the writer owns the in-flight flag from here on.
    pub fn submit(mut self, message: Bytes) -> Result<(), WriteRefused> {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.armed = false;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = self.connection_id, "writer queue full, message dropped");
                Err(WriteRefused::InProgress)
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = self.connection_id, "writer closed before submit");
                Err(WriteRefused::NoConnection)
            }
        }
    }
}

impl Drop for WritePermit {
    fn drop(&mut self) {
        if self.armed {
            self.in_flight.store(false, Ordering::Release);
        }
    }
}

/// Everything a writer task needs besides its socket
struct WriterContext {
    id: u64,
    peer: SocketAddr,
    in_flight: Arc<AtomicBool>,
    release_policy: ReleasePolicy,
    metrics: Arc<StreamerMetrics>,
    shared: Weak<Shared>,
}

impl WriterContext {
    fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    fn release_after_write(&self) {
        if self.release_policy == ReleasePolicy::OnCompletion {
            self.release();
        }
    }
}

/// Peer went away: the connection is unusable
fn is_peer_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &[u8]) -> io::Result<()> {
    writer.write_all(message).await?;
    writer.flush().await
}

/// Writer task: one message at a time, in submission order
#[instrument(
    name = "connection_writer",
    skip_all,
    fields(peer = %ctx.peer, connection_id = ctx.id)
)]
async fn connection_writer<W>(mut writer: W, mut rx: mpsc::Receiver<Bytes>, ctx: WriterContext)
where
    W: AsyncWrite + Unpin,
{
    debug!("writer started");

    while let Some(message) = rx.recv().await {
        let started = Instant::now();
        match write_message(&mut writer, &message).await {
            Ok(()) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                // Slot is free before the write is counted
                ctx.release_after_write();
                ctx.metrics.inc_message_written(message.len());
                observability::record_message_sent(message.len(), latency_ms);
                trace!(bytes = message.len(), latency_ms, "message written");
            }
            Err(e) if is_peer_reset(&e) => {
                warn!(error = %e, "client reset the connection");
                ctx.metrics.inc_peer_reset();
                observability::record_write_failure("peer_reset");
                ctx.release();
                if let Some(shared) = ctx.shared.upgrade() {
                    shared.drop_connection(ctx.id, "reset");
                }
                return;
            }
            Err(e) => {
                error!(error = %e, bytes = message.len(), "write failed");
                ctx.metrics.inc_write_failure();
                observability::record_write_failure("io");
                ctx.release_after_write();
            }
        }
    }

    // Replaced, disconnected or shut down
    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "write half shutdown failed");
    }
    debug!("writer stopped");
}

/// Watch the read side for the client going away
///
/// Inbound bytes are discarded; end of stream or a read error drops the
/// connection.
async fn watch_peer(mut reader: OwnedReadHalf, id: u64, shared: Weak<Shared>) {
    let mut scratch = [0u8; 512];
    let event = loop {
        match reader.read(&mut scratch).await {
            Ok(0) => break "closed",
            Ok(n) => trace!(connection_id = id, bytes = n, "ignoring inbound bytes"),
            Err(e) if is_peer_reset(&e) => break "reset",
            Err(e) => {
                debug!(connection_id = id, error = %e, "read side failed");
                break "closed";
            }
        }
    };

    if let Some(shared) = shared.upgrade() {
        if shared.drop_connection(id, event) && event == "reset" {
            shared.metrics.inc_peer_reset();
        }
    }
}

#[instrument(name = "accept_loop", skip_all)]
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("accept loop started");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "incoming connection");
                    shared.accept_stream(stream);
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    debug!("accept loop stopped");
}
