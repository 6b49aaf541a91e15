//! # Transport Layer
//!
//! Connection lifecycle and the server/client endpoints.
//!
//! ## Components
//! - **Connection**: per-socket state machine (handshake, read loop,
//!   edge-triggered write chain)
//! - **Server**: accept loop, identity assignment, unicast/broadcast,
//!   inbound drain into application hooks
//! - **Client**: symmetric single-connection endpoint
//!
//! Each server or client owns a current-thread tokio runtime driven by one
//! dedicated OS thread; every socket operation for all of its connections is
//! serialized on that thread. The application interacts with the transport
//! only by posting sends and draining the shared inbound queue.

pub mod client;
pub mod connection;
pub mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ServerHandler};

use std::fmt;

/// Lightweight handle identifying one server-side connection.
///
/// Handed to application hooks instead of a connection pointer; the server
/// keeps the sole authoritative table behind it. Server-assigned identities
/// start at [`FIRST_CLIENT_ID`](crate::config::FIRST_CLIENT_ID) and grow
/// monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u32);

impl ConnId {
    /// Placeholder identity of a client-side connection, which never gets
    /// one assigned.
    pub const UNASSIGNED: ConnId = ConnId(0);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which endpoint a connection belongs to. Decides the handshake role and
/// whether inbound messages are stamped with a sender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}
