//! Envelope encode/decode.
//!
//! Field order and widths are fixed; see the crate docs for the layout table.
//! Decoding `sourceProperties` tolerates a zero length (yielding `{}`) while
//! `targetProperties` is always parsed, so a zero-length target slot fails.
//! Existing producers rely on both behaviours.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use crate::{
    ByteCursor, ByteWriter, Envelope, EnvelopeError, FieldLengths, CONTENT_LENGTH_WIDTH,
    FIXED_SIZE, HEADER_VERSION_WIDTH, NAME_LENGTH_WIDTH, PROPERTIES_LENGTH_WIDTH, TIME_UUID_WIDTH,
};

/// JSON text that encodes as a zero-length properties field.
const EMPTY_OBJECT: &str = "{}";

/// Stateless envelope codec. Every call owns its own cursor or writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

/// Everything encode needs, resolved before the buffer is sized.
struct EncodePlan<'a> {
    header_version: i8,
    time_uuid: [u8; 16],
    source_name: &'a str,
    source_properties: Option<String>,
    target_name: &'a str,
    target_properties: Option<String>,
    content_body: &'a [u8],
    lengths: FieldLengths,
}

impl EncodePlan<'_> {
    fn total_len(&self) -> usize {
        FIXED_SIZE
            + usize::from(self.lengths.source_name)
            + usize::from(self.lengths.source_properties)
            + usize::from(self.lengths.target_name)
            + usize::from(self.lengths.target_properties)
            + self.content_body.len()
    }
}

impl EnvelopeCodec {
    /// Decode a base64 (standard alphabet, padded) envelope.
    pub fn decode(base64_text: &str) -> Result<Envelope, EnvelopeError> {
        let bytes = BASE64_STANDARD.decode(base64_text)?;
        Self::decode_bytes(&bytes)
    }

    /// Decode raw envelope bytes.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
        let mut cursor = ByteCursor::new(bytes);

        let header = cursor.read_fixed_int(HEADER_VERSION_WIDTH)?;
        let header_version = header.to_le_bytes()[0];

        let mut time_uuid = [0u8; 16];
        time_uuid.copy_from_slice(cursor.read_bytes(TIME_UUID_WIDTH)?);

        let source_name_len = read_u16_prefix(&mut cursor, NAME_LENGTH_WIDTH)?;
        let source_name = cursor.read_utf8(usize::from(source_name_len))?;

        let source_properties_len = read_u16_prefix(&mut cursor, PROPERTIES_LENGTH_WIDTH)?;
        let source_properties_text = cursor.read_utf8(usize::from(source_properties_len))?;
        let source_properties = if source_properties_text.is_empty() {
            JsonValue::Object(JsonMap::new())
        } else {
            parse_json("sourceProperties", source_properties_text)?
        };

        let target_name_len = read_u16_prefix(&mut cursor, NAME_LENGTH_WIDTH)?;
        let target_name = cursor.read_utf8(usize::from(target_name_len))?;

        let target_properties_len = read_u16_prefix(&mut cursor, PROPERTIES_LENGTH_WIDTH)?;
        let target_properties_text = cursor.read_utf8(usize::from(target_properties_len))?;
        let target_properties = parse_json("targetProperties", target_properties_text)?;

        let content_len = cursor.read_length_field(CONTENT_LENGTH_WIDTH)?;
        let content_body = cursor.read_bytes(content_len as usize)?.to_vec();

        if !cursor.is_exhausted() {
            log::debug!(
                "ignoring {} trailing bytes after envelope content at offset {}",
                cursor.remaining(),
                cursor.offset()
            );
        }
        log::trace!(
            "decoded envelope v{header_version}: {} bytes, content {content_len} bytes",
            bytes.len()
        );

        Ok(Envelope {
            header_version,
            time_uuid: Uuid::from_bytes(time_uuid).hyphenated().to_string(),
            source_name: source_name.to_string(),
            source_properties,
            target_name: target_name.to_string(),
            target_properties,
            content_body,
            lengths: FieldLengths {
                source_name: source_name_len,
                source_properties: source_properties_len,
                target_name: target_name_len,
                target_properties: target_properties_len,
                content: content_len,
            },
        })
    }

    /// Encode an envelope to base64 text.
    pub fn encode(envelope: &Envelope) -> Result<String, EnvelopeError> {
        Ok(BASE64_STANDARD.encode(Self::encode_bytes(envelope)?))
    }

    /// Encode an envelope to raw bytes. Stored [`FieldLengths`] are ignored.
    pub fn encode_bytes(envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
        let plan = plan(envelope)?;
        let total = plan.total_len();
        let mut writer = ByteWriter::with_len(total);

        writer.write_fixed_int(i16::from(plan.header_version), HEADER_VERSION_WIDTH)?;
        writer.copy_bytes(&plan.time_uuid, TIME_UUID_WIDTH)?;

        write_text(&mut writer, plan.source_name, plan.lengths.source_name)?;
        write_properties(
            &mut writer,
            plan.source_properties.as_deref(),
            plan.lengths.source_properties,
        )?;
        write_text(&mut writer, plan.target_name, plan.lengths.target_name)?;
        write_properties(
            &mut writer,
            plan.target_properties.as_deref(),
            plan.lengths.target_properties,
        )?;

        writer.write_length_field(plan.lengths.content, CONTENT_LENGTH_WIDTH)?;
        writer.copy_bytes(plan.content_body, plan.content_body.len())?;

        log::trace!("encoded envelope v{}: {total} bytes", envelope.header_version);
        Ok(writer.finish())
    }

    /// Exact byte size [`EnvelopeCodec::encode_bytes`] would produce.
    pub fn encoded_len(envelope: &Envelope) -> Result<usize, EnvelopeError> {
        Ok(plan(envelope)?.total_len())
    }

    /// Length prefixes [`EnvelopeCodec::encode_bytes`] would write.
    pub fn field_lengths(envelope: &Envelope) -> Result<FieldLengths, EnvelopeError> {
        Ok(plan(envelope)?.lengths)
    }
}

fn plan(envelope: &Envelope) -> Result<EncodePlan<'_>, EnvelopeError> {
    let time_uuid = envelope.time_uuid_bytes()?;
    let source_properties = serialize_properties("sourceProperties", &envelope.source_properties)?;
    let target_properties = serialize_properties("targetProperties", &envelope.target_properties)?;

    let lengths = FieldLengths {
        source_name: u16_prefix("sourceName", envelope.source_name.len())?,
        source_properties: u16_prefix(
            "sourceProperties",
            source_properties.as_ref().map_or(0, String::len),
        )?,
        target_name: u16_prefix("targetName", envelope.target_name.len())?,
        target_properties: u16_prefix(
            "targetProperties",
            target_properties.as_ref().map_or(0, String::len),
        )?,
        content: u32::try_from(envelope.content_body.len()).map_err(|_| {
            EnvelopeError::FieldTooLong {
                field: "contentBody",
                len: envelope.content_body.len(),
                max: u32::MAX as usize,
            }
        })?,
    };

    Ok(EncodePlan {
        header_version: i8::from_le_bytes([envelope.header_version]),
        time_uuid,
        source_name: &envelope.source_name,
        source_properties,
        target_name: &envelope.target_name,
        target_properties,
        content_body: &envelope.content_body,
        lengths,
    })
}

/// Serialize properties compactly; `None` when the text is exactly `{}`.
fn serialize_properties(
    field: &'static str,
    value: &JsonValue,
) -> Result<Option<String>, EnvelopeError> {
    let text = serde_json::to_string(value)
        .map_err(|source| EnvelopeError::JsonInvalid { field, source })?;
    Ok((text != EMPTY_OBJECT).then_some(text))
}

fn u16_prefix(field: &'static str, len: usize) -> Result<u16, EnvelopeError> {
    u16::try_from(len).map_err(|_| EnvelopeError::FieldTooLong {
        field,
        len,
        max: usize::from(u16::MAX),
    })
}

fn read_u16_prefix(cursor: &mut ByteCursor<'_>, width: usize) -> Result<u16, EnvelopeError> {
    let value = cursor.read_length_field(width)?;
    // Two-byte prefixes never exceed u16::MAX.
    u16::try_from(value)
        .map_err(|_| EnvelopeError::ValueOutOfRange { value: i64::from(value), width })
}

fn parse_json(field: &'static str, text: &str) -> Result<JsonValue, EnvelopeError> {
    serde_json::from_str(text).map_err(|source| EnvelopeError::JsonInvalid { field, source })
}

fn write_text(writer: &mut ByteWriter, text: &str, len: u16) -> Result<(), EnvelopeError> {
    writer.write_length_field(u32::from(len), NAME_LENGTH_WIDTH)?;
    writer.write_utf8(text, usize::from(len))
}

fn write_properties(
    writer: &mut ByteWriter,
    text: Option<&str>,
    len: u16,
) -> Result<(), EnvelopeError> {
    writer.write_length_field(u32::from(len), PROPERTIES_LENGTH_WIDTH)?;
    match text {
        Some(text) => writer.write_utf8(text, usize::from(len)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TIME_UUID: &str = "c64768f0-2623-e611-81a4-0e3b241d74e9";

    fn sample() -> Envelope {
        Envelope::new(TIME_UUID, "device-1", "topic/a", b"payload".to_vec())
            .with_source_properties(json!({"EntityType": "device"}))
            .with_target_properties(json!({"EntityType": "topic"}))
    }

    #[test]
    fn roundtrip_preserves_fields_and_lengths() {
        let envelope = sample();
        let encoded = EnvelopeCodec::encode(&envelope).expect("encode");
        let decoded = EnvelopeCodec::decode(&encoded).expect("decode");
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.lengths, EnvelopeCodec::field_lengths(&envelope).expect("lengths"));
        assert_eq!(decoded.lengths.source_name, 8);
        assert_eq!(decoded.lengths.content, 7);
    }

    #[test]
    fn encoded_len_matches_output() {
        let envelope = sample();
        let bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        assert_eq!(EnvelopeCodec::encoded_len(&envelope).expect("len"), bytes.len());
    }

    #[test]
    fn minimal_envelope_is_fixed_size() {
        let envelope = Envelope::new(TIME_UUID, "", "", Vec::new());
        let bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        assert_eq!(bytes.len(), FIXED_SIZE);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..17], &envelope.time_uuid_bytes().expect("uuid"));
        assert!(bytes[17..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_source_properties_are_elided() {
        let envelope = Envelope::new(TIME_UUID, "s", "t", Vec::new())
            .with_target_properties(json!({"k": 1}));
        let bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        // header + uuid + name len + "s"
        let offset = 1 + 16 + 2 + 1;
        assert_eq!(&bytes[offset..offset + 2], &[0, 0]);
        assert_eq!(&bytes[offset + 2..offset + 4], &[1, 0]);
        assert_eq!(bytes[offset + 4], b't');

        let decoded = EnvelopeCodec::decode_bytes(&bytes).expect("decode");
        assert_eq!(decoded.source_properties, json!({}));
        assert_eq!(decoded.lengths.source_properties, 0);
    }

    #[test]
    fn zero_length_target_properties_fail() {
        let envelope = Envelope::new(TIME_UUID, "s", "t", Vec::new());
        let bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        assert!(matches!(
            EnvelopeCodec::decode_bytes(&bytes),
            Err(EnvelopeError::JsonInvalid { field: "targetProperties", .. })
        ));
    }

    #[test]
    fn elision_is_literal_text_match() {
        // Non-object values that happen to be empty are written out.
        let envelope = Envelope::new(TIME_UUID, "s", "t", Vec::new())
            .with_source_properties(json!([]))
            .with_target_properties(json!("{}"));
        let lengths = EnvelopeCodec::field_lengths(&envelope).expect("lengths");
        assert_eq!(lengths.source_properties, 2);
        assert_eq!(lengths.target_properties, 4);
    }

    #[test]
    fn names_are_never_elided() {
        let envelope = Envelope::new(TIME_UUID, "{}", "{}", Vec::new())
            .with_target_properties(json!({"k": 1}));
        let lengths = EnvelopeCodec::field_lengths(&envelope).expect("lengths");
        assert_eq!(lengths.source_name, 2);
        assert_eq!(lengths.target_name, 2);
        let decoded =
            EnvelopeCodec::decode(&EnvelopeCodec::encode(&envelope).expect("encode")).expect("decode");
        assert_eq!(decoded.source_name, "{}");
        assert_eq!(decoded.target_name, "{}");
    }

    #[test]
    fn multibyte_names_use_byte_lengths() {
        let envelope = Envelope::new(TIME_UUID, "gerät", "ziel/ü", "ok")
            .with_target_properties(json!({"name": "größe"}));
        let decoded =
            EnvelopeCodec::decode(&EnvelopeCodec::encode(&envelope).expect("encode")).expect("decode");
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.lengths.source_name, 6);
        assert_eq!(decoded.lengths.target_name, 7);
        assert_eq!(decoded.lengths.target_properties, 18);
    }

    #[test]
    fn header_version_keeps_high_bit() {
        let envelope = sample().with_header_version(0xFF);
        let bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(EnvelopeCodec::decode_bytes(&bytes).expect("decode").header_version, 0xFF);
    }

    #[test]
    fn uuid_text_is_sequential_hex() {
        let mut bytes = EnvelopeCodec::encode_bytes(&sample()).expect("encode");
        bytes[1..17].copy_from_slice(&[
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ]);
        let decoded = EnvelopeCodec::decode_bytes(&bytes).expect("decode");
        assert_eq!(decoded.time_uuid, "00112233-4455-6677-8899-aabbccddeeff");
    }

    #[test]
    fn invalid_uuid_fails_encode() {
        let mut envelope = sample();
        envelope.time_uuid = "not-a-uuid".to_string();
        assert!(matches!(EnvelopeCodec::encode(&envelope), Err(EnvelopeError::UuidInvalid(_))));
    }

    #[test]
    fn oversized_name_fails_encode() {
        let mut envelope = sample();
        envelope.target_name = "x".repeat(usize::from(u16::MAX) + 1);
        assert!(matches!(
            EnvelopeCodec::encode_bytes(&envelope),
            Err(EnvelopeError::FieldTooLong { field: "targetName", len: 65_536, max: 65_535 })
        ));
    }

    #[test]
    fn invalid_source_json_fails_decode() {
        let mut bytes = EnvelopeCodec::encode_bytes(&sample()).expect("encode");
        // First byte of the source properties text.
        let offset = 1 + 16 + 2 + "device-1".len() + 2;
        assert_eq!(bytes[offset], b'{');
        bytes[offset] = b'[';
        assert!(matches!(
            EnvelopeCodec::decode_bytes(&bytes),
            Err(EnvelopeError::JsonInvalid { field: "sourceProperties", .. })
        ));
    }

    #[test]
    fn invalid_utf8_name_fails_decode() {
        let mut bytes = EnvelopeCodec::encode_bytes(&sample()).expect("encode");
        bytes[1 + 16 + 2] = 0xFF;
        assert!(matches!(
            EnvelopeCodec::decode_bytes(&bytes),
            Err(EnvelopeError::InvalidUtf8 { offset: 19, len: 8, .. })
        ));
    }

    #[test]
    fn every_truncation_is_an_underrun() {
        let bytes = EnvelopeCodec::encode_bytes(&sample()).expect("encode");
        for cut in 0..bytes.len() {
            let err = EnvelopeCodec::decode_bytes(&bytes[..cut]).expect_err("truncated");
            assert!(err.is_truncation(), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let envelope = sample();
        let mut bytes = EnvelopeCodec::encode_bytes(&envelope).expect("encode");
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(EnvelopeCodec::decode_bytes(&bytes).expect("decode"), envelope);
    }

    #[test]
    fn rejects_non_base64_text() {
        assert!(matches!(
            EnvelopeCodec::decode("Not base64 encoded payload"),
            Err(EnvelopeError::Base64Invalid(_))
        ));
    }
}
