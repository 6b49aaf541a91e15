//! Connection handshake: a deterministic nonce/scramble exchange.
//!
//! On accept, the server writes an 8-byte time-based nonce; the client must
//! scramble it with the fixed bit transform and write the result back before
//! any frames flow. This is a liveness/anti-bot heuristic, not a security
//! boundary: there is no key, no secrecy, and the transform is public. It
//! exists to drop peers that talk the wrong protocol, and its exact bit
//! behavior is part of the wire contract.
//!
//! The exchange runs on the raw stream in native byte order, before framing
//! begins, with no header of its own.

use crate::error::{NetError, Result};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Fixed bit transform both sides must agree on.
///
/// XOR, nibble swap under 56-bit masks, XOR again. The masks deliberately
/// exclude the top byte, so the top output byte is always zero; that quirk
/// is part of the wire contract and must not be "fixed".
pub fn scramble(n: u64) -> u64 {
    let out = n ^ 0xF00BA4BA7;
    let out = (out & 0xF0F0F0F0F0F0F0) >> 4 | (out & 0x0F0F0F0F0F0F0F) << 4;
    out ^ 0xF00BA71324
}

/// Time-based nonce. Deliberately not cryptographically random: uniqueness
/// over time is all the exchange needs.
pub fn fresh_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Server side: issue the challenge and verify the peer's answer.
///
/// Writes `nonce`, reads 8 bytes back, and compares against
/// `scramble(nonce)`. A mismatch or any I/O error is a handshake failure;
/// the caller closes the socket.
pub async fn challenge(stream: &mut TcpStream, nonce: u64) -> Result<()> {
    let expected = scramble(nonce);

    stream.write_all(&nonce.to_ne_bytes()).await?;

    let mut reply = [0u8; 8];
    stream.read_exact(&mut reply).await?;

    if u64::from_ne_bytes(reply) == expected {
        debug!("handshake answer verified");
        Ok(())
    } else {
        Err(NetError::HandshakeFailed(
            "scramble mismatch".to_string(),
        ))
    }
}

/// Client side: read the challenge and answer it.
///
/// The server gives no acceptance signal; a wrong answer only shows up as
/// the socket closing underneath the subsequent read loop.
pub async fn respond(stream: &mut TcpStream) -> Result<()> {
    let mut nonce = [0u8; 8];
    stream.read_exact(&mut nonce).await?;

    let answer = scramble(u64::from_ne_bytes(nonce));
    stream.write_all(&answer.to_ne_bytes()).await?;

    debug!("handshake answer sent");
    Ok(())
}
