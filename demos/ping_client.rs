//! Ping client: sends a timestamped `ServerPing` once a second and prints
//! the measured round-trip time.
//!
//! Run a `ping_server` first, then `cargo run --example ping_client`.

use framelink::prelude::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

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

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn main() -> framelink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut client = Client::new();
    client.connect("127.0.0.1", 60000)?;

    while client.connected() {
        let mut ping = Message::new(MessageType::ServerPing);
        ping.push(now_nanos());
        client.send(ping);

        client.incoming().wait();
        if let Some(owned) = client.incoming().pop_front() {
            let mut msg = owned.message;
            let then: u64 = msg.pop()?;
            info!(rtt_us = (now_nanos().saturating_sub(then)) / 1_000, "pong");
        }

        std::thread::sleep(Duration::from_secs(1));
    }

    warn!("server went away");
    Ok(())
}
