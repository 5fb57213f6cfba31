//! Bounds-checked primitive reads and length-prefixed writes.
//!
//! All integers are big-endian. Lengths and counts are `i32` on the wire,
//! so anything longer than `i32::MAX` cannot be written and any negative
//! prefix is rejected on read.

use bytes::{Buf, BufMut, BytesMut};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A cursor over an input slice. Every read checks the remaining length
/// first and fails with [`ProtocolError::Truncated`] instead of panicking.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, context: &'static str, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < needed {
            return Err(ProtocolError::Truncated {
                context,
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self, context: &'static str) -> Result<u8, ProtocolError> {
        self.ensure(context, 1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn read_i8(&mut self, context: &'static str) -> Result<i8, ProtocolError> {
        self.ensure(context, 1)?;
        Ok(self.buf.get_i8())
    }

    pub(crate) fn read_i16(&mut self, context: &'static str) -> Result<i16, ProtocolError> {
        self.ensure(context, 2)?;
        Ok(self.buf.get_i16())
    }

    pub(crate) fn read_i32(&mut self, context: &'static str) -> Result<i32, ProtocolError> {
        self.ensure(context, 4)?;
        Ok(self.buf.get_i32())
    }

    pub(crate) fn read_i64(&mut self, context: &'static str) -> Result<i64, ProtocolError> {
        self.ensure(context, 8)?;
        Ok(self.buf.get_i64())
    }

    pub(crate) fn read_f32(&mut self, context: &'static str) -> Result<f32, ProtocolError> {
        self.ensure(context, 4)?;
        Ok(self.buf.get_f32())
    }

    pub(crate) fn read_f64(&mut self, context: &'static str) -> Result<f64, ProtocolError> {
        self.ensure(context, 8)?;
        Ok(self.buf.get_f64())
    }

    /// Reads an `i32` length or count prefix.
    pub(crate) fn read_length(&mut self, context: &'static str) -> Result<usize, ProtocolError> {
        let length = self.read_i32(context)?;
        usize::try_from(length).map_err(|_| ProtocolError::NegativeLength {
            context,
            length: i64::from(length),
        })
    }

    /// Borrows the next `len` bytes.
    pub(crate) fn read_slice(
        &mut self,
        context: &'static str,
        len: usize,
    ) -> Result<&'a [u8], ProtocolError> {
        self.ensure(context, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Reads an `i32`-length-prefixed byte run.
    pub(crate) fn read_prefixed(&mut self, context: &'static str) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_length(context)?;
        self.read_slice(context, len)
    }

    /// Reads an `i32`-length-prefixed UTF-8 string.
    pub(crate) fn read_string(&mut self, context: &'static str) -> Result<String, ProtocolError> {
        let bytes = self.read_prefixed(context)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8 { context })
    }

    /// Consumes the reader, failing if any input is left over.
    pub(crate) fn finish(self) -> Result<(), ProtocolError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes(self.buf.len()))
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Writes `len` as an `i32` prefix.
pub(crate) fn put_length(
    buf: &mut BytesMut,
    context: &'static str,
    len: usize,
) -> Result<(), ProtocolError> {
    let len = i32::try_from(len)
        .map_err(|_| ProtocolError::InvalidMessage(format!("{context} too long: {len}")))?;
    buf.put_i32(len);
    Ok(())
}

/// Writes `bytes` with an `i32` length prefix.
pub(crate) fn put_prefixed(
    buf: &mut BytesMut,
    context: &'static str,
    bytes: &[u8],
) -> Result<(), ProtocolError> {
    put_length(buf, context, bytes.len())?;
    buf.put_slice(bytes);
    Ok(())
}

/// Writes a string as `i32` byte length plus UTF-8.
pub(crate) fn put_string(
    buf: &mut BytesMut,
    context: &'static str,
    s: &str,
) -> Result<(), ProtocolError> {
    put_prefixed(buf, context, s.as_bytes())
}
