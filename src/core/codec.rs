//! Tokio codec for framing messages over byte streams.
//!
//! ## Wire Format
//! ```text
//! [Id(4, native u32)] [BodySize(4, native u32)] [Body(BodySize)]
//! ```
//!
//! No byte-order conversion is performed; both peers must share a native
//! layout. A header claiming a body larger than
//! [`MAX_BODY_SIZE`](crate::config::MAX_BODY_SIZE) or carrying an unknown
//! tag is a decode error, which is terminal for the connection.

use crate::config::MAX_BODY_SIZE;
use crate::core::message::{Header, Message, MessageId};
use crate::error::NetError;
use bytes::{Buf, BufMut, BytesMut};
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

/// Fixed size of the frame header on the wire.
pub const HEADER_LEN: usize = 8;

/// Codec translating between [`Message`] values and wire frames.
pub struct FrameCodec<T: MessageId> {
    _id: PhantomData<T>,
}

impl<T: MessageId> FrameCodec<T> {
    pub fn new() -> Self {
        Self { _id: PhantomData }
    }
}

impl<T: MessageId> Default for FrameCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MessageId> Decoder for FrameCodec<T> {
    type Item = Message<T>;
    type Error = NetError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message<T>>, NetError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let raw_id = u32::from_ne_bytes(src[0..4].try_into().map_err(|_| NetError::InvalidHeader)?);
        let size =
            u32::from_ne_bytes(src[4..8].try_into().map_err(|_| NetError::InvalidHeader)?) as usize;

        if size > MAX_BODY_SIZE {
            return Err(NetError::OversizedFrame(size));
        }

        if src.len() < HEADER_LEN + size {
            // Reserve the rest of the frame up front to avoid repeated growth.
            src.reserve(HEADER_LEN + size - src.len());
            return Ok(None);
        }

        let id = T::from_wire(raw_id).ok_or(NetError::UnknownMessageId(raw_id))?;

        src.advance(HEADER_LEN);
        let body = src.split_to(size).to_vec();

        Ok(Some(Message {
            header: Header {
                id,
                size: size as u32,
            },
            body,
        }))
    }
}

impl<T: MessageId> Encoder<Message<T>> for FrameCodec<T> {
    type Error = NetError;

    fn encode(&mut self, msg: Message<T>, dst: &mut BytesMut) -> Result<(), NetError> {
        dst.reserve(HEADER_LEN + msg.body.len());

        dst.put_u32_ne(msg.header.id.to_wire());
        dst.put_u32_ne(msg.body.len() as u32);
        dst.put_slice(&msg.body);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Ping,
        Chat,
    }

    impl MessageId for Kind {
        fn to_wire(self) -> u32 {
            match self {
                Kind::Ping => 0,
                Kind::Chat => 1,
            }
        }

        fn from_wire(raw: u32) -> Option<Self> {
            match raw {
                0 => Some(Kind::Ping),
                1 => Some(Kind::Chat),
                _ => None,
            }
        }
    }

    fn codec() -> FrameCodec<Kind> {
        FrameCodec::new()
    }

    #[test]
    fn frame_round_trip() {
        let mut msg = Message::new(Kind::Chat);
        msg.push(0x1122334455667788u64);
        msg.push(0x99u8);

        let mut buf = BytesMut::new();
        codec().encode(msg.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN + 9);

        let decoded = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_body_round_trip() {
        let msg = Message::new(Kind::Ping);

        let mut buf = BytesMut::new();
        codec().encode(msg.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);

        let decoded = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let mut msg = Message::new(Kind::Chat);
        msg.push([0xABu8; 32]);

        let mut full = BytesMut::new();
        codec().encode(msg.clone(), &mut full).unwrap();

        let mut c = codec();
        let mut buf = BytesMut::new();

        // Header alone, then header plus half the body: not yet a frame.
        buf.extend_from_slice(&full[..HEADER_LEN]);
        assert!(c.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[HEADER_LEN..HEADER_LEN + 16]);
        assert!(c.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[HEADER_LEN + 16..]);
        assert_eq!(c.decode(&mut buf).unwrap().unwrap(), msg);
    }

    #[test]
    fn oversized_claim_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(0);
        buf.put_u32_ne((MAX_BODY_SIZE + 1) as u32);

        match codec().decode(&mut buf) {
            Err(NetError::OversizedFrame(n)) => assert_eq!(n, MAX_BODY_SIZE + 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(0xFFFF_FFFF);
        buf.put_u32_ne(0);

        match codec().decode(&mut buf) {
            Err(NetError::UnknownMessageId(raw)) => assert_eq!(raw, 0xFFFF_FFFF),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let mut first = Message::new(Kind::Ping);
        first.push(1u32);
        let mut second = Message::new(Kind::Chat);
        second.push(2u32);

        let mut buf = BytesMut::new();
        let mut c = codec();
        c.encode(first.clone(), &mut buf).unwrap();
        c.encode(second.clone(), &mut buf).unwrap();

        assert_eq!(c.decode(&mut buf).unwrap().unwrap(), first);
        assert_eq!(c.decode(&mut buf).unwrap().unwrap(), second);
        assert!(c.decode(&mut buf).unwrap().is_none());
    }
}
