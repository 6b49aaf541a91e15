//! Client endpoint: a symmetric single-connection wrapper around the same
//! connection machinery the server uses.

use crate::core::message::{Message, MessageId, OwnedMessage};
use crate::error::{NetError, Result};
use crate::transport::{ConnId, Connection, Side};
use crate::utils::queue::TsDeque;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Message-oriented TCP client holding at most one connection.
///
/// Owns its own inbound queue and I/O thread. Unlike the server there is no
/// drain method: the application reads [`Client::incoming`] directly,
/// popping or [`wait`](TsDeque::wait)ing on it.
pub struct Client<T: MessageId> {
    inbound: Arc<TsDeque<OwnedMessage<T>>>,
    connection: Option<Arc<Connection<T>>>,
    stop: Option<oneshot::Sender<()>>,
    driver: Option<std::thread::JoinHandle<()>>,
}

impl<T: MessageId> Client<T> {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(TsDeque::new()),
            connection: None,
            stop: None,
            driver: None,
        }
    }

    /// Resolve `host`, open the connection, and start the I/O thread.
    ///
    /// Returns `Ok` once the TCP connect succeeds. A passed handshake is
    /// *not* implied: the server gives no acceptance signal, so a rejected
    /// handshake only surfaces as the connection closing shortly after.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        if self.connection.is_some() {
            self.disconnect();
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        let stream = match runtime.block_on(TcpStream::connect((host, port))) {
            Ok(stream) => stream,
            Err(e) => {
                error!(host, port, error = %e, "unable to connect");
                return Err(e.into());
            }
        };

        let conn = Arc::new(Connection::new(
            Side::Client,
            ConnId::UNASSIGNED,
            runtime.handle().clone(),
            Arc::clone(&self.inbound),
        ));
        Arc::clone(&conn).spawn_client_side(stream);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let driver = std::thread::Builder::new()
            .name("framelink-client-io".to_string())
            .spawn(move || {
                let _ = runtime.block_on(stop_rx);
            })
            .map_err(NetError::Io)?;

        self.connection = Some(conn);
        self.stop = Some(stop_tx);
        self.driver = Some(driver);

        info!(host, port, "connected");
        Ok(())
    }

    /// Close the connection (if any), then stop and join the I/O thread.
    /// Idempotent; also runs on drop.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.disconnect();
        }
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(driver) = self.driver.take() {
            let _ = driver.join();
        }
    }

    /// Whether the connection is present and still believed open.
    pub fn connected(&self) -> bool {
        self.connection
            .as_ref()
            .map(|conn| conn.is_open())
            .unwrap_or(false)
    }

    /// Post `msg` for transmission; a no-op when not connected.
    pub fn send(&self, msg: Message<T>) {
        match &self.connection {
            Some(conn) if conn.is_open() => Arc::clone(conn).send(msg),
            _ => debug!("send ignored, not connected"),
        }
    }

    /// The inbound mailbox. Messages arrive with `sender == None`; the
    /// sender is implicitly the one server.
    pub fn incoming(&self) -> &TsDeque<OwnedMessage<T>> {
        &self.inbound
    }
}

impl<T: MessageId> Default for Client<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MessageId> Drop for Client<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
