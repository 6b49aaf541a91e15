//! # Core Transport Components
//!
//! Message model and wire framing.
//!
//! ## Components
//! - **Message**: typed header plus a LIFO byte stack of fixed-layout fields
//! - **Codec**: tokio codec framing messages over byte streams
//!
//! ## Wire Format
//! ```text
//! [Id(4, native u32)] [BodySize(4, native u32)] [Body(N)]
//! ```
//!
//! ## Safety
//! - Maximum body size: 16 MB (prevents memory exhaustion on bad headers)
//! - Length validation before allocation
//! - Unknown tags rejected at decode time

pub mod codec;
pub mod message;
