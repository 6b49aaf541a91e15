//! Ping server: accepts every client and echoes `ServerPing` messages back.
//!
//! Run with `cargo run --example ping_server`, then point one or more
//! `ping_client` instances at it.

use framelink::prelude::*;
use std::net::SocketAddr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageType {
    ServerPing,
}

impl MessageId for MessageType {
    fn to_wire(self) -> u32 {
        0
    }

    fn from_wire(raw: u32) -> Option<Self> {
        (raw == 0).then_some(MessageType::ServerPing)
    }
}

struct PingServer;

impl ServerHandler<MessageType> for PingServer {
    fn on_client_connect(&self, peer: SocketAddr) -> bool {
        info!(%peer, "client connecting");
        true
    }

    fn on_client_validated(&self, client: ConnId) {
        info!(%client, "client validated");
    }

    fn on_client_disconnect(&self, client: ConnId) {
        info!(%client, "client removed");
    }

    fn on_message(&self, server: &Server<MessageType>, sender: ConnId, msg: Message<MessageType>) {
        match msg.id() {
            MessageType::ServerPing => {
                info!(%sender, "server pinged");
                server.send(sender, msg);
            }
        }
    }
}

fn main() -> framelink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut server = Server::new(60000, PingServer);
    server.start()?;

    loop {
        server.update(None, true);
    }
}
