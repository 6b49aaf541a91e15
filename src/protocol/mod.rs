//! # Protocol Layer
//!
//! The pre-frame wire exchange.
//!
//! ## Components
//! - **Handshake**: deterministic nonce/scramble challenge that gates every
//!   connection before the framed read/write loops start

pub mod handshake;
