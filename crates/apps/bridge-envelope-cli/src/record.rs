//! JSON interchange shape for envelopes on the command line.

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use bridge_envelope::{Envelope, FieldLengths, HEADER_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::config::ContentMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRecord {
    #[serde(default = "default_header_version")]
    pub header_version: u8,
    #[serde(rename = "timeUUID")]
    pub time_uuid: String,
    pub source_name: String,
    #[serde(default = "empty_object")]
    pub source_properties: JsonValue,
    pub target_name: String,
    #[serde(default = "empty_object")]
    pub target_properties: JsonValue,
    pub content_body: JsonValue,
    /// Informational on output, ignored on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lengths: Option<LengthsRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthsRecord {
    pub source_name_length: u16,
    pub source_properties_length: u16,
    pub target_name_length: u16,
    pub target_properties_length: u16,
    pub content_length: u32,
}

impl From<FieldLengths> for LengthsRecord {
    fn from(lengths: FieldLengths) -> Self {
        Self {
            source_name_length: lengths.source_name,
            source_properties_length: lengths.source_properties,
            target_name_length: lengths.target_name,
            target_properties_length: lengths.target_properties,
            content_length: lengths.content,
        }
    }
}

fn default_header_version() -> u8 {
    HEADER_VERSION
}

fn empty_object() -> JsonValue {
    JsonValue::Object(JsonMap::new())
}

impl EnvelopeRecord {
    pub fn from_envelope(envelope: Envelope, content: ContentMode) -> anyhow::Result<Self> {
        let content_body = match content {
            ContentMode::Utf8 => {
                let text = String::from_utf8(envelope.content_body)
                    .context("content body is not utf-8; use --content base64")?;
                JsonValue::String(text)
            }
            ContentMode::Base64 => JsonValue::String(BASE64_STANDARD.encode(&envelope.content_body)),
            ContentMode::Json => envelope.content_json().context("content body is not json")?,
        };

        Ok(Self {
            header_version: envelope.header_version,
            time_uuid: envelope.time_uuid,
            source_name: envelope.source_name,
            source_properties: envelope.source_properties,
            target_name: envelope.target_name,
            target_properties: envelope.target_properties,
            content_body,
            lengths: Some(envelope.lengths.into()),
        })
    }

    pub fn into_envelope(self, content: ContentMode) -> anyhow::Result<Envelope> {
        let content_body = match (content, self.content_body) {
            (ContentMode::Utf8, JsonValue::String(text)) => text.into_bytes(),
            (ContentMode::Base64, JsonValue::String(text)) => {
                BASE64_STANDARD.decode(text).context("contentBody is not valid base64")?
            }
            (ContentMode::Json, value) => serde_json::to_vec(&value)?,
            (mode, _) => return Err(anyhow!("contentBody must be a string in {mode:?} mode")),
        };

        Ok(Envelope::new(self.time_uuid, self.source_name, self.target_name, content_body)
            .with_header_version(self.header_version)
            .with_source_properties(self.source_properties)
            .with_target_properties(self.target_properties))
    }
}
