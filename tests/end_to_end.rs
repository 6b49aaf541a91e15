//! Full loopback round trip: server and client, handshake, ping echo.

use framelink::prelude::*;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageType {
    Ping,
}

impl MessageId for MessageType {
    fn to_wire(self) -> u32 {
        2
    }

    fn from_wire(raw: u32) -> Option<Self> {
        (raw == 2).then_some(MessageType::Ping)
    }
}

/// Accepts everyone and echoes every message back to its sender, recording
/// the sender identities it saw.
struct EchoServer {
    senders: Arc<Mutex<Vec<ConnId>>>,
}

impl ServerHandler<MessageType> for EchoServer {
    fn on_client_connect(&self, _peer: SocketAddr) -> bool {
        true
    }

    fn on_message(&self, server: &Server<MessageType>, sender: ConnId, msg: Message<MessageType>) {
        self.senders.lock().unwrap().push(sender);
        server.send(sender, msg);
    }
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn ping_round_trips_through_the_server() {
    let senders = Arc::new(Mutex::new(Vec::new()));
    let mut server = Server::new(
        0,
        EchoServer {
            senders: Arc::clone(&senders),
        },
    );
    server.start().expect("server should bind an ephemeral port");
    let port = server.local_addr().expect("server is bound").port();

    let mut client = Client::new();
    client
        .connect("127.0.0.1", port)
        .expect("loopback connect should succeed");

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    let mut ping = Message::new(MessageType::Ping);
    ping.push(stamp);

    // Posted immediately after connect, so this may queue behind the
    // handshake and flush on activation.
    client.send(ping);

    let echoed = wait_until(Duration::from_secs(5), || {
        server.update(None, false);
        !client.incoming().is_empty()
    });
    assert!(echoed, "echo never arrived back at the client");

    // The server saw exactly one message, from a server-assigned identity.
    let seen = senders.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].get() >= 10_000, "identity {} below 10000", seen[0]);

    // Client-side messages carry no sender; the payload must round-trip.
    let owned = client.incoming().pop_front().expect("one echoed message");
    assert_eq!(owned.sender, None);
    assert_eq!(owned.message.id(), MessageType::Ping);

    let mut msg = owned.message;
    assert_eq!(msg.pop::<u64>().unwrap(), stamp);
    assert_eq!(msg.size(), 0);
    assert!(client.incoming().is_empty());

    client.disconnect();
    server.stop();
    assert!(!server.is_running());
}

#[test]
fn identities_grow_monotonically_per_accept() {
    let senders = Arc::new(Mutex::new(Vec::new()));
    let mut server = Server::new(
        0,
        EchoServer {
            senders: Arc::clone(&senders),
        },
    );
    server.start().unwrap();
    let port = server.local_addr().unwrap().port();

    let mut first = Client::new();
    first.connect("127.0.0.1", port).unwrap();
    let mut second = Client::new();
    second.connect("127.0.0.1", port).unwrap();

    let mut ping = Message::new(MessageType::Ping);
    ping.push(1u8);
    first.send(ping.clone());
    second.send(ping);

    assert!(wait_until(Duration::from_secs(5), || {
        server.update(None, false);
        senders.lock().unwrap().len() == 2
    }));

    let seen = senders.lock().unwrap().clone();
    assert_ne!(seen[0], seen[1]);
    assert!(seen.iter().all(|id| id.get() >= 10_000));
}

#[test]
fn connect_to_dead_port_fails() {
    // Grab an ephemeral port, then free it before the client dials in.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let mut client: Client<MessageType> = Client::new();
    assert!(client.connect("127.0.0.1", port).is_err());
    assert!(!client.connected());
}
