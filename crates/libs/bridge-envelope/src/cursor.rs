//! Offset-tracking reader over an immutable byte slice.

use crate::EnvelopeError;

/// Sequential little-endian reader.
///
/// Each successful read advances the offset by exactly the number of bytes
/// consumed. A failed read leaves the offset untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a signed little-endian integer of 1 or 2 bytes.
    pub fn read_fixed_int(&mut self, width: usize) -> Result<i16, EnvelopeError> {
        match width {
            1 => {
                let bytes = self.take::<1>()?;
                Ok(i16::from(i8::from_le_bytes(bytes)))
            }
            2 => Ok(i16::from_le_bytes(self.take::<2>()?)),
            other => Err(EnvelopeError::UnsupportedWidth(other)),
        }
    }

    /// Read an unsigned little-endian length prefix of 2 or 4 bytes.
    pub fn read_length_field(&mut self, width: usize) -> Result<u32, EnvelopeError> {
        match width {
            2 => Ok(u32::from(u16::from_le_bytes(self.take::<2>()?))),
            4 => Ok(u32::from_le_bytes(self.take::<4>()?)),
            other => Err(EnvelopeError::UnsupportedWidth(other)),
        }
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], EnvelopeError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(EnvelopeError::BufferUnderrun {
                offset: self.offset,
                needed: count,
                remaining,
            });
        }
        let buffer = self.buffer;
        let start = self.offset;
        self.offset += count;
        Ok(&buffer[start..self.offset])
    }

    /// Read `count` bytes as UTF-8 text. Malformed sequences are an error,
    /// never replaced.
    pub fn read_utf8(&mut self, count: usize) -> Result<&'a str, EnvelopeError> {
        let start = self.offset;
        let bytes = self.read_bytes(count)?;
        std::str::from_utf8(bytes).map_err(|source| {
            self.offset = start;
            EnvelopeError::InvalidUtf8 { offset: start, len: count, source }
        })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], EnvelopeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }
}
