//! # Utility Modules
//!
//! Supporting primitives used throughout the transport.
//!
//! ## Components
//! - **Queue**: mutex/condvar double-ended queue bridging the I/O and
//!   application threads

pub mod queue;

pub use queue::TsDeque;
