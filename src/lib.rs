//! # framelink
//!
//! Asynchronous, message-oriented TCP transport: one server talking to many
//! clients, or a symmetric single-connection client endpoint.
//!
//! ## What it owns
//! - Connection lifecycle: accept/connect, a deterministic handshake, teardown
//! - A length-prefixed binary frame protocol with stack-discipline field
//!   serialization ([`core::message::Message`])
//! - Per-connection outbound ordering (edge-triggered write chains)
//! - A thread-safe hand-off of inbound messages to an application-driven
//!   dispatch loop ([`transport::Server::update`] / [`utils::TsDeque`])
//!
//! ## What it does not own
//! Business message types and their handling are application callbacks
//! ([`transport::ServerHandler`]); startup, CLI, and rendering belong to the
//! caller. The handshake is a liveness heuristic, not a security protocol.
//!
//! ## Threading model
//! Each [`Server`](transport::Server) or [`Client`](transport::Client) runs
//! a current-thread tokio runtime on one dedicated OS thread; every socket
//! operation for all of its connections is serialized there. The application
//! thread interacts only by posting sends (thread-safe) and draining the
//! shared inbound queue (thread-safe, optionally blocking).
//!
//! ## Example
//! ```no_run
//! use framelink::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Ping }
//!
//! impl MessageId for Kind {
//!     fn to_wire(self) -> u32 { 0 }
//!     fn from_wire(raw: u32) -> Option<Self> { (raw == 0).then_some(Kind::Ping) }
//! }
//!
//! struct Echo;
//!
//! impl ServerHandler<Kind> for Echo {
//!     fn on_client_connect(&self, _peer: std::net::SocketAddr) -> bool { true }
//!     fn on_message(&self, server: &Server<Kind>, sender: ConnId, msg: Message<Kind>) {
//!         server.send(sender, msg);
//!     }
//! }
//!
//! fn main() -> framelink::Result<()> {
//!     let mut server = Server::new(60000, Echo);
//!     server.start()?;
//!     loop {
//!         server.update(None, true);
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use error::{NetError, Result};

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::core::message::{Message, MessageId, OwnedMessage, Payload};
    pub use crate::transport::{Client, ConnId, Server, ServerHandler};
    pub use crate::utils::TsDeque;
    pub use crate::{NetError, Result};
}
