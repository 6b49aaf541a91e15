//! Server endpoint: accept loop, identity assignment, send/broadcast, and
//! the drain that moves inbound messages into application hooks.

use crate::config::{ServerConfig, FIRST_CLIENT_ID};
use crate::core::message::{Message, MessageId, OwnedMessage};
use crate::error::{NetError, Result};
use crate::transport::{ConnId, Connection, Side};
use crate::utils::queue::TsDeque;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Application callbacks the server invokes.
///
/// Implement this once and hand it to [`Server::new`]; hooks receive
/// [`ConnId`] handles, never connection objects. All methods have default
/// implementations, and `on_client_connect` defaults to **deny**, so a
/// server with an all-default handler accepts nobody.
///
/// `on_client_connect` and `on_client_validated` run on the server's I/O
/// thread and should return quickly; `on_client_disconnect` and `on_message`
/// run on whichever application thread called [`Server::send`],
/// [`Server::broadcast`] or [`Server::update`].
pub trait ServerHandler<T: MessageId>: Send + Sync + 'static {
    /// Gate for an incoming socket, called before the handshake begins.
    fn on_client_connect(&self, peer: SocketAddr) -> bool {
        let _ = peer;
        false
    }

    /// The connection passed the handshake and is now Active.
    fn on_client_validated(&self, client: ConnId) {
        let _ = client;
    }

    /// The connection was found closed and removed from the active set.
    fn on_client_disconnect(&self, client: ConnId) {
        let _ = client;
    }

    /// One inbound message, delivered from [`Server::update`].
    fn on_message(&self, server: &Server<T>, sender: ConnId, message: Message<T>) {
        let _ = (server, sender, message);
    }
}

type ConnTable<T> = Mutex<HashMap<ConnId, Arc<Connection<T>>>>;

/// Message-oriented TCP server.
///
/// Owns the shared inbound queue, the authoritative connection table, and a
/// current-thread tokio runtime driven by one dedicated OS thread. All
/// public methods are callable from any application thread.
pub struct Server<T: MessageId> {
    config: ServerConfig,
    handler: Arc<dyn ServerHandler<T>>,
    inbound: Arc<TsDeque<OwnedMessage<T>>>,
    connections: Arc<ConnTable<T>>,
    next_id: Arc<AtomicU32>,
    io: Option<Handle>,
    local_addr: Option<SocketAddr>,
    stop: Option<oneshot::Sender<()>>,
    driver: Option<std::thread::JoinHandle<()>>,
}

impl<T: MessageId> Server<T> {
    /// Server listening on `port`, all interfaces, default limits.
    pub fn new(port: u16, handler: impl ServerHandler<T>) -> Self {
        Self::with_config(ServerConfig::on_port(port), handler)
    }

    pub fn with_config(config: ServerConfig, handler: impl ServerHandler<T>) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            inbound: Arc::new(TsDeque::new()),
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(FIRST_CLIENT_ID)),
            io: None,
            local_addr: None,
            stop: None,
            driver: None,
        }
    }

    /// Bind the listener, arm the accept loop, and start the I/O thread.
    ///
    /// Fails only for listen-time errors (bad address, port in use); once
    /// this returns `Ok`, connection failures are per-connection events.
    pub fn start(&mut self) -> Result<()> {
        if self.io.is_some() {
            return Ok(());
        }

        let addr: SocketAddr = self.config.address.parse().map_err(|_| {
            NetError::ConfigError(format!("invalid listen address: {}", self.config.address))
        })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        let listener = match runtime.block_on(TcpListener::bind(addr)) {
            Ok(listener) => listener,
            Err(e) => {
                error!(address = %addr, error = %e, "unable to start listener");
                return Err(e.into());
            }
        };

        self.local_addr = listener.local_addr().ok();

        let handle = runtime.handle().clone();
        handle.spawn(Self::accept_loop(
            listener,
            handle.clone(),
            Arc::clone(&self.handler),
            Arc::clone(&self.inbound),
            Arc::clone(&self.connections),
            Arc::clone(&self.next_id),
            self.config.max_connections,
        ));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let driver = std::thread::Builder::new()
            .name("framelink-server-io".to_string())
            .spawn(move || {
                // Drive the runtime until told to stop; dropping it here
                // cancels every connection task and closes the sockets.
                let _ = runtime.block_on(stop_rx);
            })
            .map_err(NetError::Io)?;

        self.io = Some(handle);
        self.stop = Some(stop_tx);
        self.driver = Some(driver);

        info!(address = ?self.local_addr, "server started");
        Ok(())
    }

    /// Stop the I/O thread and tear down every connection. Idempotent;
    /// also runs on drop.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
        if self.io.take().is_some() {
            self.lock_table().clear();
            info!("server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.io.is_some()
    }

    /// Actual bound address, once started. Useful when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connections currently tracked (including ones not yet
    /// discovered dead).
    pub fn connection_count(&self) -> usize {
        self.lock_table().len()
    }

    /// Send `msg` to one client.
    ///
    /// A target that turned out closed is cleaned up instead: the
    /// disconnect hook fires and it leaves the active set. Sending to an
    /// unknown identity is a no-op.
    pub fn send(&self, client: ConnId, msg: Message<T>) {
        let target = self.lock_table().get(&client).cloned();

        match target {
            Some(conn) if conn.is_open() => conn.send(msg),
            Some(_) => {
                self.lock_table().remove(&client);
                self.handler.on_client_disconnect(client);
            }
            None => {}
        }
    }

    /// Send `msg` to every connected client except `except`.
    ///
    /// Connections found closed during the scan are swept out in a single
    /// pass afterwards, each with a disconnect hook call.
    pub fn broadcast(&self, msg: Message<T>, except: Option<ConnId>) {
        let mut dead = Vec::new();

        {
            let table = self.lock_table();
            for (&id, conn) in table.iter() {
                if conn.is_open() {
                    if Some(id) != except {
                        Arc::clone(conn).send(msg.clone());
                    }
                } else {
                    // Mark now, sweep after the scan.
                    dead.push(id);
                }
            }
        }

        if !dead.is_empty() {
            {
                let mut table = self.lock_table();
                for id in &dead {
                    table.remove(id);
                }
            }
            for id in dead {
                self.handler.on_client_disconnect(id);
            }
        }
    }

    /// Drain inbound messages into the message hook on the calling thread.
    ///
    /// With `wait` set, blocks until the inbound queue is non-empty first.
    /// Then pops up to `max` messages (all of them when `None`) and invokes
    /// `on_message` for each. Returns the number dispatched. This is the
    /// only point where inbound traffic crosses into the application.
    pub fn update(&self, max: Option<usize>, wait: bool) -> usize {
        if wait {
            self.inbound.wait();
        }

        let cap = max.unwrap_or(usize::MAX);
        let mut handled = 0;

        while handled < cap {
            let Some(owned) = self.inbound.pop_front() else {
                break;
            };

            // Server-side connections always stamp a sender.
            if let Some(sender) = owned.sender {
                self.handler.on_message(self, sender, owned.message);
            }
            handled += 1;
        }

        handled
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<ConnId, Arc<Connection<T>>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn accept_loop(
        listener: TcpListener,
        io: Handle,
        handler: Arc<dyn ServerHandler<T>>,
        inbound: Arc<TsDeque<OwnedMessage<T>>>,
        connections: Arc<ConnTable<T>>,
        next_id: Arc<AtomicU32>,
        max_connections: usize,
    ) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let tracked = connections
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .len();
                    if tracked >= max_connections {
                        warn!(%peer, tracked, "connection limit reached, dropping socket");
                        continue;
                    }

                    if handler.on_client_connect(peer) {
                        let id = ConnId(next_id.fetch_add(1, Ordering::SeqCst));
                        info!(%peer, %id, "connection approved");

                        let conn = Arc::new(Connection::new(
                            Side::Server,
                            id,
                            io.clone(),
                            Arc::clone(&inbound),
                        ));
                        connections
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(id, Arc::clone(&conn));

                        conn.spawn_server_side(stream, Arc::clone(&handler));
                    } else {
                        info!(%peer, "connection denied");
                    }
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}

impl<T: MessageId> Drop for Server<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
