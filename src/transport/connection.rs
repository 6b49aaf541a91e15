//! Per-socket connection state machine.
//!
//! A connection moves through `Handshaking -> Active -> Closed`, never
//! backwards. During Active it runs two loops on its owner's I/O thread:
//!
//! - the **read loop** decodes frames off the socket and pushes them into
//!   the owner's shared inbound queue, then immediately reads on;
//! - the **write chain** drains the connection's own outbound queue through
//!   the framed sink. It is edge-triggered: [`Connection::send`] only starts
//!   a chain when the queue was empty at the moment of the push, so at most
//!   one chain is in flight and frames leave in enqueue order.
//!
//! Any I/O error on either loop is terminal for this connection only: log,
//! mark closed, drop the socket. Closure is discovered lazily by the owner
//! the next time it addresses this connection.

use crate::core::codec::FrameCodec;
use crate::core::message::{Message, MessageId, OwnedMessage};
use crate::protocol::handshake;
use crate::transport::server::ServerHandler;
use crate::transport::{ConnId, Side};
use crate::utils::queue::TsDeque;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

type FrameSink<T> = FramedWrite<OwnedWriteHalf, FrameCodec<T>>;
type FrameSource<T> = FramedRead<OwnedReadHalf, FrameCodec<T>>;

/// One live socket plus its queues.
///
/// The socket halves are touched only from the owner's I/O thread; the
/// outbound queue is filled through tasks posted there, so the [`TsDeque`]'s
/// own lock is the only synchronization involved.
pub struct Connection<T: MessageId> {
    side: Side,
    id: ConnId,
    io: Handle,
    open: AtomicBool,
    outbound: TsDeque<Message<T>>,
    inbound: Arc<TsDeque<OwnedMessage<T>>>,
    sink: AsyncMutex<Option<FrameSink<T>>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: MessageId> Connection<T> {
    pub(crate) fn new(
        side: Side,
        id: ConnId,
        io: Handle,
        inbound: Arc<TsDeque<OwnedMessage<T>>>,
    ) -> Self {
        Self {
            side,
            id,
            io,
            open: AtomicBool::new(true),
            outbound: TsDeque::new(),
            inbound,
            sink: AsyncMutex::new(None),
            read_task: Mutex::new(None),
        }
    }

    /// Server-assigned identity; [`ConnId::UNASSIGNED`] on the client side.
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Whether the socket is still believed open. Turns false on the first
    /// terminal I/O error, on peer close, or on [`disconnect`](Self::disconnect).
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Post `msg` to the I/O thread for transmission.
    ///
    /// Callable from any thread. Messages on one connection are delivered in
    /// the order they were posted; a chain is only started when the outbound
    /// queue was empty, so concurrent sends never interleave frames.
    pub fn send(self: Arc<Self>, msg: Message<T>) {
        if !self.is_open() {
            return;
        }

        let io = self.io.clone();
        io.spawn(async move {
            let was_empty = self.outbound.is_empty();
            self.outbound.push_back(msg);

            if was_empty {
                self.drive_writes().await;
            }
        });
    }

    /// Post socket teardown to the I/O thread. Idempotent.
    pub fn disconnect(self: Arc<Self>) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }

        let io = self.io.clone();
        io.spawn(async move {
            let task = self
                .read_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(task) = task {
                task.abort();
            }

            // Dropping the write half closes our side of the socket.
            *self.sink.lock().await = None;
            info!(id = %self.id, "connection closed");
        });
    }

    /// Server side: run the handshake challenge, then enter the Active loops.
    pub(crate) fn spawn_server_side(
        self: Arc<Self>,
        mut stream: TcpStream,
        handler: Arc<dyn ServerHandler<T>>,
    ) {
        let io = self.io.clone();
        io.spawn(async move {
            let nonce = handshake::fresh_nonce();
            match handshake::challenge(&mut stream, nonce).await {
                Ok(()) => {
                    info!(id = %self.id, "client validated");
                    handler.on_client_validated(self.id);
                    self.activate(stream).await;
                }
                Err(e) => {
                    warn!(id = %self.id, error = %e, "handshake failed, dropping connection");
                    self.open.store(false, Ordering::SeqCst);
                }
            }
        });
    }

    /// Client side: answer the handshake, then enter the Active loops.
    /// There is no acceptance signal; a rejected answer shows up as the
    /// socket closing under the read loop.
    pub(crate) fn spawn_client_side(self: Arc<Self>, mut stream: TcpStream) {
        let io = self.io.clone();
        io.spawn(async move {
            match handshake::respond(&mut stream).await {
                Ok(()) => self.activate(stream).await,
                Err(e) => {
                    warn!(error = %e, "handshake failed, dropping connection");
                    self.open.store(false, Ordering::SeqCst);
                }
            }
        });
    }

    /// Split the socket, install the framed sink, start the read loop, and
    /// flush anything queued while the handshake was still in flight.
    async fn activate(self: Arc<Self>, stream: TcpStream) {
        if !self.is_open() {
            // Disconnected while the handshake was in flight; dropping the
            // stream here closes the socket.
            debug!(id = %self.id, "activation skipped, already closed");
            return;
        }

        let (read_half, write_half) = stream.into_split();
        let source = FramedRead::new(read_half, FrameCodec::new());

        *self.sink.lock().await = Some(FramedWrite::new(write_half, FrameCodec::new()));

        let task = self.io.spawn(Arc::clone(&self).read_loop(source));
        *self
            .read_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        if !self.outbound.is_empty() {
            self.drive_writes().await;
        }
    }

    /// Continuous inbound loop: decode a frame, stamp it with this
    /// connection's identity (server side only), hand it to the shared
    /// inbound queue, read on. No backpressure.
    async fn read_loop(self: Arc<Self>, mut source: FrameSource<T>) {
        while let Some(next) = source.next().await {
            match next {
                Ok(message) => {
                    debug!(id = %self.id, %message, "frame received");

                    let sender = match self.side {
                        Side::Server => Some(self.id),
                        Side::Client => None,
                    };
                    self.inbound.push_back(OwnedMessage { sender, message });
                }
                Err(e) => {
                    error!(id = %self.id, error = %e, "read failed, closing connection");
                    break;
                }
            }
        }

        // EOF and error are equally terminal.
        self.open.store(false, Ordering::SeqCst);
        *self.sink.lock().await = None;
        debug!(id = %self.id, "read loop ended");
    }

    /// Drain the outbound queue front-first through the sink. The sink lock
    /// serializes chains; a write failure closes the connection and leaves
    /// the remaining queue contents undelivered.
    async fn drive_writes(&self) {
        let mut sink = self.sink.lock().await;

        loop {
            let Some(writer) = sink.as_mut() else {
                // Not active yet; whatever is queued is flushed on activation.
                return;
            };
            let Some(msg) = self.outbound.front() else {
                return;
            };

            if let Err(e) = writer.send(msg).await {
                error!(id = %self.id, error = %e, "write failed, closing connection");
                self.open.store(false, Ordering::SeqCst);
                *sink = None;
                return;
            }

            self.outbound.pop_front();
        }
    }
}
