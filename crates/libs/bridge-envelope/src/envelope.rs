//! In-memory envelope value and its wire length prefixes.

use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use crate::{EnvelopeError, HEADER_VERSION};

/// Wire length prefixes of the five variable-width fields.
///
/// These are artifacts of the byte layout: decode fills them from the wire,
/// encode recomputes them and ignores whatever is stored here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldLengths {
    pub source_name: u16,
    pub source_properties: u16,
    pub target_name: u16,
    pub target_properties: u16,
    pub content: u32,
}

/// A decoded bridge envelope.
///
/// Equality compares the seven carried fields and ignores [`FieldLengths`],
/// which are derived from them.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub header_version: u8,
    /// Canonical `8-4-4-4-12` hex text of the 16 wire bytes.
    pub time_uuid: String,
    pub source_name: String,
    pub source_properties: JsonValue,
    pub target_name: String,
    pub target_properties: JsonValue,
    pub content_body: Vec<u8>,
    pub lengths: FieldLengths,
}

impl Envelope {
    /// Create an envelope with the current header version and empty
    /// properties on both sides.
    pub fn new(
        time_uuid: impl Into<String>,
        source_name: impl Into<String>,
        target_name: impl Into<String>,
        content_body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            header_version: HEADER_VERSION,
            time_uuid: time_uuid.into(),
            source_name: source_name.into(),
            source_properties: JsonValue::Object(JsonMap::new()),
            target_name: target_name.into(),
            target_properties: JsonValue::Object(JsonMap::new()),
            content_body: content_body.into(),
            lengths: FieldLengths::default(),
        }
    }

    pub fn with_header_version(mut self, header_version: u8) -> Self {
        self.header_version = header_version;
        self
    }

    pub fn with_source_properties(mut self, properties: JsonValue) -> Self {
        self.source_properties = properties;
        self
    }

    pub fn with_target_properties(mut self, properties: JsonValue) -> Self {
        self.target_properties = properties;
        self
    }

    /// Parse the textual time UUID into its 16 wire bytes, in textual order.
    pub fn time_uuid_bytes(&self) -> Result<[u8; 16], EnvelopeError> {
        Ok(*Uuid::parse_str(&self.time_uuid)?.as_bytes())
    }

    /// Content body as UTF-8 text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content_body).ok()
    }

    /// Content body parsed as JSON.
    pub fn content_json(&self) -> Result<JsonValue, EnvelopeError> {
        serde_json::from_slice(&self.content_body)
            .map_err(|source| EnvelopeError::JsonInvalid { field: "contentBody", source })
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.header_version == other.header_version
            && self.time_uuid == other.time_uuid
            && self.source_name == other.source_name
            && self.source_properties == other.source_properties
            && self.target_name == other.target_name
            && self.target_properties == other.target_properties
            && self.content_body == other.content_body
    }
}

impl Eq for Envelope {}
