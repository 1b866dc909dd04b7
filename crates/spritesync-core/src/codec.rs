//! Binary codec for tagged wire messages.
//!
//! Layout rules shared by every message:
//! - One leading tag byte selects the message
//! - Fixed-width integers are little-endian
//! - Strings and pixel blobs are a `u32` byte length followed by raw bytes
//! - A batch is `count:u16` followed by `count` length-prefixed sub-messages
//!
//! Framing by explicit length lets pixel payloads carry arbitrary bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CodecError, Result};
use crate::messages::tags;

/// Cursor over a message payload.
///
/// Every read checks the remaining length first, so a truncated payload is
/// reported as [`CodecError::UnexpectedEof`] rather than a panic.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Whether the payload is fully consumed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(CodecError::UnexpectedEof {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Borrow the next `len` bytes without copying.
    pub fn slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// A `u32`-length-prefixed blob.
    pub fn blob(&mut self) -> Result<Bytes> {
        let len = self.u32()? as usize;
        Ok(Bytes::copy_from_slice(self.slice(len)?))
    }

    /// A `u32`-length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.slice(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Fail if anything is left over.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes(self.remaining()))
        }
    }
}

/// Write a `u32`-length-prefixed blob.
pub fn put_blob(out: &mut BytesMut, field: &'static str, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len()).map_err(|_| CodecError::FieldTooLarge {
        field,
        len: data.len(),
    })?;
    out.put_u32_le(len);
    out.put_slice(data);
    Ok(())
}

/// Write a `u32`-length-prefixed string.
pub fn put_string(out: &mut BytesMut, field: &'static str, s: &str) -> Result<()> {
    put_blob(out, field, s.as_bytes())
}

/// Narrow a count to the `u16` the wire carries.
pub fn count_u16(field: &'static str, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| CodecError::FieldTooLarge { field, len })
}

/// Narrow a count to the `u32` the wire carries.
pub fn count_u32(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| CodecError::FieldTooLarge { field, len })
}

/// A message family that shares the tag/payload framing and batching.
///
/// Implemented by both directions of the protocol. Only the per-tag body is
/// message specific; framing, batching and trailing-byte checks live here.
pub trait WireMessage: Sized {
    /// The leading tag byte.
    fn tag(&self) -> u8;

    /// Write the payload that follows the tag.
    fn encode_body(&self, out: &mut BytesMut) -> Result<()>;

    /// Read the payload for `tag`. Batches are handled before this is called.
    fn decode_body(tag: u8, body: &mut Reader<'_>) -> Result<Self>;

    /// Wrap messages into this family's batch variant.
    fn batch(messages: Vec<Self>) -> Self;

    /// The contained messages if this is a batch.
    fn as_batch(&self) -> Option<&[Self]>;

    /// Encode tag and payload into one frame.
    fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.encode_into(&mut out)?;
        Ok(out.freeze())
    }

    /// Append tag and payload to `out`.
    fn encode_into(&self, out: &mut BytesMut) -> Result<()> {
        match self.as_batch() {
            Some(messages) => {
                out.put_u8(tags::BATCH);
                out.put_u16_le(count_u16("batch count", messages.len())?);
                for message in messages {
                    let sub = message.encode()?;
                    put_blob(out, "batch entry", &sub)?;
                }
                Ok(())
            }
            None => {
                out.put_u8(self.tag());
                self.encode_body(out)
            }
        }
    }

    /// Decode one frame strictly: any malformed sub-message fails the whole
    /// frame, and the payload must be consumed exactly.
    fn decode(frame: &[u8]) -> Result<Self> {
        decode_at::<Self>(frame, 0)
    }
}

/// Deepest batch nesting accepted on decode. A top-level batch is depth 1.
pub const MAX_BATCH_DEPTH: usize = 8;

fn too_deep() -> CodecError {
    CodecError::InvalidField(format!("batch nesting deeper than {MAX_BATCH_DEPTH}"))
}

fn decode_at<M: WireMessage>(frame: &[u8], depth: usize) -> Result<M> {
    let mut reader = Reader::new(frame);
    let tag = reader.u8()?;
    let message = if tag == tags::BATCH {
        if depth >= MAX_BATCH_DEPTH {
            return Err(too_deep());
        }
        let count = reader.u16()?;
        let mut messages = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = reader.u32()? as usize;
            messages.push(decode_at::<M>(reader.slice(len)?, depth + 1)?);
        }
        M::batch(messages)
    } else {
        M::decode_body(tag, &mut reader)?
    };
    reader.finish()?;
    Ok(message)
}

/// Decode a frame leniently into its constituent messages.
///
/// A non-batch frame yields exactly one result. A batch yields one result per
/// declared sub-message, in order; nested batches are flattened down to
/// [`MAX_BATCH_DEPTH`], and a deeper batch yields one error. Sub-message
/// boundaries come from the declared lengths, so a sub-message that fails to
/// parse does not disturb the ones after it. Broken batch framing (a
/// truncated length prefix, or bytes beyond the declared entries) ends the
/// sequence with an error.
pub fn unbatch<M: WireMessage>(frame: &[u8]) -> Vec<Result<M>> {
    let mut out = Vec::new();
    unbatch_into(frame, &mut out, 0);
    out
}

fn unbatch_into<M: WireMessage>(frame: &[u8], out: &mut Vec<Result<M>>, depth: usize) {
    if frame.first() != Some(&tags::BATCH) {
        out.push(M::decode(frame));
        return;
    }
    if depth >= MAX_BATCH_DEPTH {
        out.push(Err(too_deep()));
        return;
    }

    let mut reader = Reader::new(&frame[1..]);
    let count = match reader.u16() {
        Ok(count) => count,
        Err(e) => {
            out.push(Err(e));
            return;
        }
    };

    for _ in 0..count {
        let entry = reader
            .u32()
            .and_then(|len| reader.slice(len as usize));
        match entry {
            Ok(sub) => unbatch_into(sub, out, depth + 1),
            Err(e) => {
                out.push(Err(e));
                return;
            }
        }
    }

    if let Err(e) = reader.finish() {
        out.push(Err(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{InboundMessage, OutboundMessage};

    #[test]
    fn test_reader_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xff, 0xff, 0xff, 0xff];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u16().unwrap(), 0x0201);
        assert_eq!(reader.u32().unwrap(), 0x0605_0403);
        assert_eq!(reader.i32().unwrap(), -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_truncated() {
        let data = [0x05, 0x00, 0x00, 0x00, b'a', b'b'];
        let mut reader = Reader::new(&data);
        let err = reader.string().unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                needed: 5,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_reader_invalid_utf8() {
        let data = [0x02, 0x00, 0x00, 0x00, 0xc3, 0x28];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.string().unwrap_err(), CodecError::InvalidUtf8);
    }

    #[test]
    fn test_blob_layout() {
        let mut out = BytesMut::new();
        put_string(&mut out, "name", "abc").unwrap();
        assert_eq!(&out[..], &[3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn test_batch_framing() {
        let batch = OutboundMessage::Batch(vec![
            OutboundMessage::ActiveSprite { name: "a".into() },
            OutboundMessage::ActiveSprite { name: String::new() },
        ]);
        let bytes = batch.encode().unwrap();

        // '[' count=2, then two entries of (len:4, 'A' len:4 name)
        assert_eq!(bytes[0], b'[');
        assert_eq!(&bytes[1..3], &[2, 0]);
        assert_eq!(&bytes[3..7], &[6, 0, 0, 0]);
        assert_eq!(bytes[7], b'A');
        assert_eq!(bytes.len(), 3 + (4 + 6) + (4 + 5));
    }

    #[test]
    fn test_unbatch_skips_malformed_entry() {
        let good_a = InboundMessage::Focus { name: "a".into() }.encode().unwrap();
        let good_b = InboundMessage::Focus { name: "b".into() }.encode().unwrap();

        let mut frame = BytesMut::new();
        frame.put_u8(b'[');
        frame.put_u16_le(3);
        put_blob(&mut frame, "entry", &good_a).unwrap();
        // Unknown tag, declared length still frames it correctly.
        put_blob(&mut frame, "entry", &[b'?', 1, 2, 3]).unwrap();
        put_blob(&mut frame, "entry", &good_b).unwrap();

        let results = unbatch::<InboundMessage>(&frame);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &InboundMessage::Focus { name: "a".into() }
        );
        assert_eq!(results[1].as_ref().unwrap_err(), &CodecError::UnknownTag(b'?'));
        assert_eq!(
            results[2].as_ref().unwrap(),
            &InboundMessage::Focus { name: "b".into() }
        );

        // Strict decoding rejects the whole frame.
        assert!(InboundMessage::decode(&frame).is_err());
    }

    #[test]
    fn test_unbatch_flattens_nested() {
        let inner = InboundMessage::Batch(vec![
            InboundMessage::Focus { name: "x".into() },
            InboundMessage::Focus { name: "y".into() },
        ]);
        let outer = InboundMessage::Batch(vec![inner, InboundMessage::Focus { name: "z".into() }]);
        let frame = outer.encode().unwrap();

        let names: Vec<String> = unbatch::<InboundMessage>(&frame)
            .into_iter()
            .map(|r| match r.unwrap() {
                InboundMessage::Focus { name } => name,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_unbatch_reports_trailing_bytes() {
        let mut frame = BytesMut::from(
            &InboundMessage::Batch(vec![InboundMessage::Focus { name: "a".into() }])
                .encode()
                .unwrap()[..],
        );
        frame.put_u8(0xAA);

        let results = unbatch::<InboundMessage>(&frame);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err(), &CodecError::TrailingBytes(1));
    }

    #[test]
    fn test_unbatch_truncated_length_prefix() {
        let frame = [b'[', 2, 0, 1, 0];
        let results = unbatch::<InboundMessage>(&frame);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    /// `levels` batches of one entry each, wrapped around a Focus message.
    fn nested_batches(levels: usize) -> Vec<u8> {
        let leaf = InboundMessage::Focus { name: "a".into() }.encode().unwrap();
        let mut frame = Vec::with_capacity(levels * 7 + leaf.len());
        for level in (0..levels).rev() {
            frame.push(b'[');
            frame.extend_from_slice(&1u16.to_le_bytes());
            frame.extend_from_slice(&((leaf.len() + level * 7) as u32).to_le_bytes());
        }
        frame.extend_from_slice(&leaf);
        frame
    }

    #[test]
    fn test_batch_nesting_limit() {
        let frame = nested_batches(MAX_BATCH_DEPTH);
        assert_eq!(unbatch::<InboundMessage>(&frame).len(), 1);
        assert!(unbatch::<InboundMessage>(&frame)[0].is_ok());
        assert!(InboundMessage::decode(&frame).is_ok());

        let frame = nested_batches(MAX_BATCH_DEPTH + 1);
        let results = unbatch::<InboundMessage>(&frame);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(CodecError::InvalidField(_))));
        assert!(matches!(
            InboundMessage::decode(&frame),
            Err(CodecError::InvalidField(_))
        ));
    }

    #[test]
    fn test_deep_nesting_rejected_once() {
        let frame = nested_batches(200_000);
        let results = unbatch::<InboundMessage>(&frame);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
        assert!(OutboundMessage::decode(&frame).is_err());
    }

    #[test]
    fn test_empty_frame() {
        assert!(matches!(
            OutboundMessage::decode(&[]),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert_eq!(unbatch::<OutboundMessage>(&[]).len(), 1);
    }
}
