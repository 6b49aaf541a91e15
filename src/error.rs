//! # Error Types
//!
//! Error handling for the transport.
//!
//! This module defines all error variants that can occur during transport
//! operations, from low-level I/O errors to framing and handshake failures.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and listener failures
//! - **Framing Errors**: malformed, oversized, or unknown-tag frames
//! - **Handshake Errors**: failed challenge/response exchange
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! Every active-state framing or I/O error is terminal for the connection it
//! occurred on: the socket is closed and no recovery is attempted. Errors on
//! one connection never affect its siblings or the owning endpoint.

use std::io;
use thiserror::Error;

/// NetError is the primary error type for all transport operations.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Unknown message id on the wire: {0:#010x}")]
    UnknownMessageId(u32),

    #[error("Frame body too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Message body underflow: needed {needed} bytes, {available} available")]
    BodyUnderflow { needed: usize, available: usize },

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using NetError.
pub type Result<T> = std::result::Result<T, NetError>;
