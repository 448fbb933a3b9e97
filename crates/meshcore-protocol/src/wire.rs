//! Bounds-checked field access for little-endian wire records.
//!
//! Every record decoder reads through a [`WireReader`], so a truncated frame
//! turns into [`ProtocolError::FrameTooShort`] instead of a slice panic.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Cursor over a record body.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        WireReader {
            buf: data,
            total: data.len(),
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.total - self.buf.remaining()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Fail unless at least `n` more bytes are available.
    pub fn require(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < n {
            return Err(ProtocolError::too_short(self.position() + n, self.total));
        }
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.require(n)?;
        self.buf.advance(n);
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn i8(&mut self) -> Result<i8, ProtocolError> {
        self.require(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.require(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn i16(&mut self) -> Result<i16, ProtocolError> {
        self.require(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.require(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.require(4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Borrow the next `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.require(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Copy the next `N` bytes into an array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// A fixed-width NUL-padded text field.
    pub fn fixed_text(&mut self, width: usize) -> Result<String, ProtocolError> {
        Ok(decode_text(self.bytes(width)?))
    }

    /// Consume everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = self.buf;
        self.buf = &[];
        out
    }

    /// Consume the rest as text, stopping at the first NUL.
    pub fn rest_text(&mut self) -> String {
        decode_text(self.rest())
    }
}

/// Lossy UTF-8 up to the first NUL byte.
pub fn decode_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Write `text` into a NUL-padded field of `width` bytes.
///
/// At most `width - 1` bytes are kept so the field stays NUL-terminated;
/// truncation never splits a UTF-8 sequence.
pub fn put_fixed_text(buf: &mut Vec<u8>, text: &str, width: usize) {
    let mut len = text.len().min(width.saturating_sub(1));
    while !text.is_char_boundary(len) {
        len -= 1;
    }
    buf.put_slice(&text.as_bytes()[..len]);
    buf.put_bytes(0, width - len);
}
