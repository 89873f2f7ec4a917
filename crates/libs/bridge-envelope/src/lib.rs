//! # bridge-envelope
//!
//! Binary envelope codec for bridging stream records to a downstream target.
//!
//! An envelope carries routing metadata (source and target names plus free-form
//! JSON properties) and an opaque content payload. On the wire it is a packed
//! little-endian byte layout, transported as standard base64 text.
//!
//! ## Wire Format
//!
//! ```text
//! [version:1][time_uuid:16]
//! [source_name_len:2][source_name]
//! [source_props_len:2][source_props]
//! [target_name_len:2][target_name]
//! [target_props_len:2][target_props]
//! [content_len:4][content]
//! ```
//!
//! Length prefixes are unsigned little-endian. Properties are compact JSON
//! text; a properties value serializing to exactly `{}` is written as a zero
//! length with no payload.
//!
//! ## Example
//!
//! ```rust
//! use bridge_envelope::{Envelope, EnvelopeCodec};
//! use serde_json::json;
//!
//! let envelope = Envelope::new(
//!     "c64768f0-2623-e611-81a4-0e3b241d74e9",
//!     "sensor-7",
//!     "fleet/telemetry",
//!     b"hello".to_vec(),
//! )
//! .with_target_properties(json!({"EntityType": "topic"}));
//!
//! let encoded = EnvelopeCodec::encode(&envelope).unwrap();
//! let decoded = EnvelopeCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, envelope);
//! assert_eq!(decoded.lengths.content, 5);
//! ```

mod codec;
mod cursor;
mod envelope;
mod error;
mod writer;

pub use codec::EnvelopeCodec;
pub use cursor::ByteCursor;
pub use envelope::{Envelope, FieldLengths};
pub use error::EnvelopeError;
pub use writer::ByteWriter;

/// Header version written by [`Envelope::new`].
pub const HEADER_VERSION: u8 = 0x01;

/// Signed header version byte.
pub const HEADER_VERSION_WIDTH: usize = 1;
/// Raw timeUUID bytes, in text order.
pub const TIME_UUID_WIDTH: usize = 16;
/// Unsigned prefix before `source_name` and `target_name`.
pub const NAME_LENGTH_WIDTH: usize = 2;
/// Unsigned prefix before each properties JSON text.
pub const PROPERTIES_LENGTH_WIDTH: usize = 2;
/// Unsigned prefix before the content body.
pub const CONTENT_LENGTH_WIDTH: usize = 4;

/// Bytes every envelope carries regardless of payload: 1 + 16 + 2 + 2 + 2 + 2 + 4 = 29
pub const FIXED_SIZE: usize = HEADER_VERSION_WIDTH
    + TIME_UUID_WIDTH
    + 2 * NAME_LENGTH_WIDTH
    + 2 * PROPERTIES_LENGTH_WIDTH
    + CONTENT_LENGTH_WIDTH;
