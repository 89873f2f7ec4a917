/// Errors from envelope encode/decode.
///
/// Every failure is terminal for the call that produced it: the codec never
/// returns a partially decoded envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid base64 payload: {0}")]
    Base64Invalid(#[from] base64::DecodeError),

    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun { offset: usize, needed: usize, remaining: usize },

    #[error("invalid utf-8 in {len}-byte field at offset {offset}")]
    InvalidUtf8 {
        offset: usize,
        len: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("invalid json in {field}: {source}")]
    JsonInvalid {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid time uuid: {0}")]
    UuidInvalid(#[from] uuid::Error),

    #[error("unsupported integer width: {0} bytes")]
    UnsupportedWidth(usize),

    #[error("{field} is {len} bytes, exceeds its length prefix maximum of {max}")]
    FieldTooLong { field: &'static str, len: usize, max: usize },

    #[error("value {value} does not fit in {width} bytes")]
    ValueOutOfRange { value: i64, width: usize },

    #[error("write of {needed} bytes at offset {offset} overflows buffer of {capacity}")]
    WriterOverflow { offset: usize, needed: usize, capacity: usize },
}

impl EnvelopeError {
    /// Returns `true` when the input ended before a field was complete.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::BufferUnderrun { .. })
    }
}
