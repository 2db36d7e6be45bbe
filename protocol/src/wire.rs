//! Byte-level encode/decode primitives shared by every message type.
//!
//! Mirrors `examples/original_source/connection.h`'s `DatagramReader`/
//! `DatagramWriter` pair: fixed-width big-endian integers, a one-byte-length-prefixed
//! string, and `u32`-counted sequences/maps. The decoding half is built
//! around [`Cursor`], which only ever peeks at a borrowed slice — nothing
//! is consumed from the caller's buffer until a full message has been
//! parsed, so a `tokio_util::codec::Decoder` can hand it a `BytesMut` and
//! safely leave the buffer untouched on a short read.

use bytes::{Buf, BufMut};

use crate::error::{EncodeError, ProtocolError};

/// Sanity cap on any wire-carried sequence/map count, well above anything
/// a real message produces, used only to reject corrupt length fields
/// before they drive an allocation.
pub const SEQUENCE_SANITY_LIMIT: u32 = 1_000_000;

/// A read-only, peek-before-consume cursor over a borrowed byte slice.
///
/// Every `try_*` method returns `None` when the slice doesn't yet hold
/// enough bytes, without advancing `pos`. Callers that parse a full
/// message structure and get `None` partway through must discard the
/// whole attempt and retry once more bytes arrive; `pos` is only
/// meaningful once the top-level parse succeeds.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    /// Bytes consumed so far. Valid once the whole message has parsed
    /// successfully; the caller advances the real buffer by this amount.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn try_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Some(v)
    }

    pub fn try_u16(&mut self) -> Option<u16> {
        if self.remaining() < 2 {
            return None;
        }
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Some(v)
    }

    pub fn try_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_be_bytes([
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ]);
        self.pos += 4;
        Some(v)
    }

    pub fn try_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    /// A length-prefixed string: `u8` length, then that many raw bytes.
    /// Decoded lossily — the wire format does not guarantee UTF-8.
    pub fn try_string(&mut self) -> Option<String> {
        let len = self.try_u8()? as usize;
        let bytes = self.try_bytes(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads a `u32` sequence/map count, rejecting absurd values outright
    /// rather than treating them as "need more data".
    pub fn try_count(&mut self) -> Result<Option<u32>, ProtocolError> {
        let Some(n) = self.try_u32() else {
            return Ok(None);
        };
        if n > SEQUENCE_SANITY_LIMIT {
            return Err(ProtocolError::SequenceTooLarge(n, SEQUENCE_SANITY_LIMIT));
        }
        Ok(Some(n))
    }
}

pub fn put_string(out: &mut impl BufMut, s: &str) -> Result<(), EncodeError> {
    let bytes = s.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(EncodeError::StringTooLong(bytes.len()));
    }
    out.put_u8(bytes.len() as u8);
    out.put_slice(bytes);
    Ok(())
}

pub fn put_count(out: &mut impl BufMut, n: usize) {
    out.put_u32(n as u32);
}

/// Reads `n` bytes from a `bytes::Buf`, used by the one-shot UDP decode
/// path once a message's full length is already known to be present.
pub fn take(buf: &mut impl Buf, n: usize) -> Vec<u8> {
    let mut v = vec![0u8; n];
    buf.copy_to_slice(&mut v);
    v
}
