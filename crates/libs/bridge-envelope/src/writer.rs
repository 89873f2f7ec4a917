//! Offset-tracking writer into a pre-sized byte buffer.

use crate::EnvelopeError;

/// Sequential little-endian writer.
///
/// The buffer is allocated once, at the exact final size, and never grows.
#[derive(Debug)]
pub struct ByteWriter {
    buffer: Vec<u8>,
    offset: usize,
}

impl ByteWriter {
    /// Create a writer over a zeroed buffer of exactly `len` bytes.
    pub fn with_len(len: usize) -> Self {
        Self { buffer: vec![0u8; len], offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Write a signed little-endian integer of 1 or 2 bytes.
    pub fn write_fixed_int(&mut self, value: i16, width: usize) -> Result<(), EnvelopeError> {
        match width {
            1 => {
                let narrow = i8::try_from(value).map_err(|_| EnvelopeError::ValueOutOfRange {
                    value: i64::from(value),
                    width,
                })?;
                self.put(&narrow.to_le_bytes())
            }
            2 => self.put(&value.to_le_bytes()),
            other => Err(EnvelopeError::UnsupportedWidth(other)),
        }
    }

    /// Write an unsigned little-endian length prefix of 2 or 4 bytes.
    pub fn write_length_field(&mut self, value: u32, width: usize) -> Result<(), EnvelopeError> {
        match width {
            2 => {
                let narrow = u16::try_from(value).map_err(|_| EnvelopeError::ValueOutOfRange {
                    value: i64::from(value),
                    width,
                })?;
                self.put(&narrow.to_le_bytes())
            }
            4 => self.put(&value.to_le_bytes()),
            other => Err(EnvelopeError::UnsupportedWidth(other)),
        }
    }

    /// Write the UTF-8 bytes of `text`. `byte_len` must equal `text.len()`.
    pub fn write_utf8(&mut self, text: &str, byte_len: usize) -> Result<(), EnvelopeError> {
        debug_assert_eq!(text.len(), byte_len, "utf-8 byte length mismatch");
        self.copy_bytes(text.as_bytes(), byte_len)
    }

    /// Copy the first `count` bytes of `source` into the buffer.
    pub fn copy_bytes(&mut self, source: &[u8], count: usize) -> Result<(), EnvelopeError> {
        let chunk = source.get(..count).ok_or(EnvelopeError::BufferUnderrun {
            offset: self.offset,
            needed: count,
            remaining: source.len(),
        })?;
        self.put(chunk)
    }

    /// Hand back the completed buffer.
    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.offset, self.buffer.len(), "envelope buffer not fully written");
        self.buffer
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), EnvelopeError> {
        let end = self
            .offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.buffer.len())
            .ok_or(EnvelopeError::WriterOverflow {
                offset: self.offset,
                needed: bytes.len(),
                capacity: self.buffer.len(),
            })?;
        self.buffer[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteCursor;

    #[test]
    fn fixed_int_writes_little_endian() {
        let mut writer = ByteWriter::with_len(3);
        writer.write_fixed_int(-1, 1).expect("i8");
        writer.write_fixed_int(561, 2).expect("i16");
        assert_eq!(writer.finish(), vec![0xFF, 0x31, 0x02]);
    }

    #[test]
    fn fixed_int_rejects_values_wider_than_one_byte() {
        let mut writer = ByteWriter::with_len(1);
        assert!(matches!(
            writer.write_fixed_int(200, 1),
            Err(EnvelopeError::ValueOutOfRange { value: 200, width: 1 })
        ));
        assert_eq!(writer.offset(), 0);
    }

    #[test]
    fn fixed_int_rejects_other_widths() {
        let mut writer = ByteWriter::with_len(8);
        assert!(matches!(writer.write_fixed_int(1, 4), Err(EnvelopeError::UnsupportedWidth(4))));
    }

    #[test]
    fn length_field_round_trips_through_cursor_16bit() {
        let mut writer = ByteWriter::with_len(6);
        writer.write_utf8("1234", 4).expect("text");
        writer.write_length_field(561, 2).expect("u16");
        let bytes = writer.finish();

        let mut cursor = ByteCursor::new(&bytes);
        cursor.read_utf8(4).expect("text");
        assert_eq!(cursor.read_length_field(2).expect("u16"), 561);
    }

    #[test]
    fn length_field_round_trips_through_cursor_32bit() {
        let mut writer = ByteWriter::with_len(8);
        writer.write_utf8("1234", 4).expect("text");
        writer.write_length_field(1_222_514, 4).expect("u32");
        let bytes = writer.finish();

        let mut cursor = ByteCursor::new(&bytes);
        cursor.read_utf8(4).expect("text");
        assert_eq!(cursor.read_length_field(4).expect("u32"), 1_222_514);
    }

    #[test]
    fn length_field_rejects_overflowing_u16() {
        let mut writer = ByteWriter::with_len(2);
        assert!(matches!(
            writer.write_length_field(70_000, 2),
            Err(EnvelopeError::ValueOutOfRange { value: 70_000, width: 2 })
        ));
        assert!(matches!(writer.write_length_field(1, 3), Err(EnvelopeError::UnsupportedWidth(3))));
    }

    #[test]
    fn copy_bytes_advances_offset() {
        let mut writer = ByteWriter::with_len(5);
        writer.copy_bytes(&[1, 2, 3], 3).expect("first");
        assert_eq!(writer.offset(), 3);
        writer.copy_bytes(&[4, 5, 6, 7], 2).expect("partial source");
        assert_eq!(writer.finish(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn copy_bytes_rejects_short_source() {
        let mut writer = ByteWriter::with_len(4);
        assert!(writer.copy_bytes(&[1, 2], 4).expect_err("short source").is_truncation());
    }

    #[test]
    fn short_source_reports_writer_offset() {
        let mut writer = ByteWriter::with_len(6);
        writer.write_utf8("ab", 2).expect("prefix");
        assert!(matches!(
            writer.copy_bytes(&[1, 2], 4),
            Err(EnvelopeError::BufferUnderrun { offset: 2, needed: 4, remaining: 2 })
        ));
        assert_eq!(writer.offset(), 2);
    }

    #[test]
    fn writes_past_capacity_are_rejected() {
        let mut writer = ByteWriter::with_len(2);
        writer.write_utf8("ab", 2).expect("fits");
        assert!(matches!(
            writer.copy_bytes(&[0], 1),
            Err(EnvelopeError::WriterOverflow { offset: 2, needed: 1, capacity: 2 })
        ));
    }
}
