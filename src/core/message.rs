//! Framed binary messages with stack-discipline field serialization.
//!
//! A [`Message`] is a typed header plus a byte body. The body behaves as a
//! LIFO field stack: [`Message::push`] appends the raw native-layout bytes of
//! a fixed-layout value to the tail, [`Message::pop`] removes them from the
//! tail. A receiver that mirrors the sender's push order must therefore pop
//! in reverse order:
//!
//! ```
//! use framelink::core::message::{Message, MessageId};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Ping }
//!
//! impl MessageId for Kind {
//!     fn to_wire(self) -> u32 { 0 }
//!     fn from_wire(raw: u32) -> Option<Self> {
//!         (raw == 0).then_some(Kind::Ping)
//!     }
//! }
//!
//! let mut msg = Message::new(Kind::Ping);
//! msg.push(1u32);
//! msg.push(2u64);
//!
//! let b: u64 = msg.pop().unwrap();
//! let a: u32 = msg.pop().unwrap();
//! assert_eq!((a, b), (1, 2));
//! ```
//!
//! No endianness conversion is performed anywhere: values travel in native
//! byte order, so both peers must share a layout.

use crate::error::{NetError, Result};
use crate::transport::ConnId;
use std::fmt;
use std::mem::{size_of, MaybeUninit};

/// Application-defined message tag carried in every frame header.
///
/// The tag travels as a native-order `u32` on the wire and has no transport
/// semantics beyond equality and dispatch. `from_wire` returns `None` for
/// values that do not name a known tag; a frame carrying one is a framing
/// error and closes the connection.
pub trait MessageId: Copy + Eq + Send + Sync + fmt::Debug + 'static {
    /// Wire representation of this tag.
    fn to_wire(self) -> u32;

    /// Tag for a wire value, if it names one.
    fn from_wire(raw: u32) -> Option<Self>;
}

/// Marker for fixed-layout values that can live on a message's field stack.
///
/// # Safety
///
/// Implementors must contain no indirection (pointers, references, heap
/// handles) and must be valid for any bit pattern of their size, since
/// [`Message::pop`] reconstructs them from raw peer-supplied bytes. Padding
/// bytes would be sent as-is, so implementors should also be padding-free.
pub unsafe trait Payload: Copy {}

unsafe impl Payload for u8 {}
unsafe impl Payload for u16 {}
unsafe impl Payload for u32 {}
unsafe impl Payload for u64 {}
unsafe impl Payload for u128 {}
unsafe impl Payload for i8 {}
unsafe impl Payload for i16 {}
unsafe impl Payload for i32 {}
unsafe impl Payload for i64 {}
unsafe impl Payload for i128 {}
unsafe impl Payload for f32 {}
unsafe impl Payload for f64 {}
unsafe impl<T: Payload, const N: usize> Payload for [T; N] {}

/// Frame header: application tag plus current body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<T: MessageId> {
    pub id: T,
    pub size: u32,
}

/// One framed message: header and byte body.
///
/// `header.size` always equals `body.len()`; every mutation through
/// [`push`](Self::push) and [`pop`](Self::pop) re-establishes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T: MessageId> {
    pub header: Header<T>,
    pub body: Vec<u8>,
}

impl<T: MessageId> Message<T> {
    /// Empty message with the given tag.
    pub fn new(id: T) -> Self {
        Self {
            header: Header { id, size: 0 },
            body: Vec::new(),
        }
    }

    /// Tag of this message.
    pub fn id(&self) -> T {
        self.header.id
    }

    /// Current body length in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Append the raw bytes of `value` to the tail of the body.
    pub fn push<V: Payload>(&mut self, value: V) {
        let bytes = unsafe {
            std::slice::from_raw_parts((&value as *const V).cast::<u8>(), size_of::<V>())
        };

        self.body.extend_from_slice(bytes);
        self.header.size = self.body.len() as u32;
    }

    /// Remove the last `size_of::<V>()` bytes of the body and reconstruct a
    /// value from them. Fields come back in the reverse of push order.
    pub fn pop<V: Payload>(&mut self) -> Result<V> {
        let needed = size_of::<V>();
        if self.body.len() < needed {
            return Err(NetError::BodyUnderflow {
                needed,
                available: self.body.len(),
            });
        }

        let at = self.body.len() - needed;
        let mut value = MaybeUninit::<V>::uninit();

        // Byte-wise copy into the (possibly higher-aligned) destination;
        // any bit pattern is a valid V per the Payload contract.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.body.as_ptr().add(at),
                value.as_mut_ptr().cast::<u8>(),
                needed,
            );
        }

        self.body.truncate(at);
        self.header.size = self.body.len() as u32;

        Ok(unsafe { value.assume_init() })
    }
}

impl<T: MessageId> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id: {:?}, size: {}", self.header.id, self.header.size)
    }
}

/// A message paired with the identity of the connection it arrived on.
///
/// Server-side connections stamp their identity into `sender`; client-side
/// connections leave it `None` (the sender is implicitly the one server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedMessage<T: MessageId> {
    pub sender: Option<ConnId>,
    pub message: Message<T>,
}
