use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use bridge_envelope::{
    ByteCursor, EnvelopeCodec, EnvelopeError, CONTENT_LENGTH_WIDTH, HEADER_VERSION_WIDTH,
    NAME_LENGTH_WIDTH, PROPERTIES_LENGTH_WIDTH, TIME_UUID_WIDTH,
};
use std::io::{BufRead, Write};

use crate::config::{ContentMode, OnError};
use crate::record::EnvelopeRecord;

/// Counts reported after a stream command finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Decode one base64 envelope per input line into one JSON object per output line.
pub fn decode_stream<R: BufRead, W: Write>(
    input: R,
    output: W,
    content: ContentMode,
    on_error: OnError,
) -> anyhow::Result<StreamSummary> {
    run_stream(input, output, on_error, |line| {
        let envelope = EnvelopeCodec::decode(line)?;
        log::debug!(
            "decoded {} -> {} ({} content bytes)",
            envelope.source_name,
            envelope.target_name,
            envelope.content_body.len()
        );
        let record = EnvelopeRecord::from_envelope(envelope, content)?;
        Ok(serde_json::to_string(&record)?)
    })
}

/// Encode one JSON envelope object per input line into one base64 line.
pub fn encode_stream<R: BufRead, W: Write>(
    input: R,
    output: W,
    content: ContentMode,
    on_error: OnError,
) -> anyhow::Result<StreamSummary> {
    run_stream(input, output, on_error, |line| {
        let record: EnvelopeRecord =
            serde_json::from_str(line).context("input is not an envelope record")?;
        let envelope = record.into_envelope(content)?;
        let encoded = EnvelopeCodec::encode(&envelope)?;
        log::debug!("encoded envelope for {} ({} chars)", envelope.target_name, encoded.len());
        Ok(encoded)
    })
}

fn run_stream<R, W, F>(
    input: R,
    mut output: W,
    on_error: OnError,
    mut convert: F,
) -> anyhow::Result<StreamSummary>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> anyhow::Result<String>,
{
    let mut summary = StreamSummary::default();
    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match convert(line) {
            Ok(rendered) => {
                writeln!(output, "{rendered}")?;
                summary.processed += 1;
            }
            Err(err) => match on_error {
                OnError::Skip => {
                    log::warn!("line {line_no}: skipping record: {err:#}");
                    summary.skipped += 1;
                }
                OnError::Halt => return Err(err.context(format!("line {line_no}"))),
            },
        }
    }
    output.flush()?;
    Ok(summary)
}

/// One field of the wire layout as seen by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub value: String,
}

/// Field-by-field walk of an envelope. Fields read before a failure are kept
/// so truncated payloads can still be examined.
#[derive(Debug)]
pub struct Inspection {
    pub total_len: usize,
    pub fields: Vec<FieldView>,
    pub error: Option<EnvelopeError>,
    pub trailing: usize,
}

pub fn inspect(base64_text: &str) -> anyhow::Result<Inspection> {
    let bytes = BASE64_STANDARD.decode(base64_text.trim()).map_err(EnvelopeError::from)?;
    Ok(inspect_bytes(&bytes))
}

pub fn inspect_bytes(bytes: &[u8]) -> Inspection {
    let mut cursor = ByteCursor::new(bytes);
    let mut fields = Vec::new();
    let error = walk_fields(&mut cursor, &mut fields).err();
    let trailing = if error.is_none() { cursor.remaining() } else { 0 };
    Inspection { total_len: bytes.len(), fields, error, trailing }
}

fn walk_fields(cursor: &mut ByteCursor<'_>, fields: &mut Vec<FieldView>) -> Result<(), EnvelopeError> {
    let offset = cursor.offset();
    let version = cursor.read_fixed_int(HEADER_VERSION_WIDTH)?.to_le_bytes()[0];
    fields.push(FieldView {
        name: "headerVersion",
        offset,
        width: HEADER_VERSION_WIDTH,
        value: version.to_string(),
    });

    let offset = cursor.offset();
    let uuid = cursor.read_bytes(TIME_UUID_WIDTH)?;
    fields.push(FieldView {
        name: "timeUUID",
        offset,
        width: TIME_UUID_WIDTH,
        value: hex::encode(uuid),
    });

    for (length_name, name, width) in [
        ("sourceNameLength", "sourceName", NAME_LENGTH_WIDTH),
        ("sourcePropertiesLength", "sourceProperties", PROPERTIES_LENGTH_WIDTH),
        ("targetNameLength", "targetName", NAME_LENGTH_WIDTH),
        ("targetPropertiesLength", "targetProperties", PROPERTIES_LENGTH_WIDTH),
        ("contentLength", "contentBody", CONTENT_LENGTH_WIDTH),
    ] {
        let offset = cursor.offset();
        let len = cursor.read_length_field(width)? as usize;
        fields.push(FieldView { name: length_name, offset, width, value: len.to_string() });

        let offset = cursor.offset();
        let payload = cursor.read_bytes(len)?;
        fields.push(FieldView { name, offset, width: len, value: render_payload(payload) });
    }
    Ok(())
}

fn render_payload(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => format!("{text:?}"),
        Err(_) => format!("0x{}", hex::encode(payload)),
    }
}

pub fn write_inspection<W: Write>(mut output: W, inspection: &Inspection) -> std::io::Result<()> {
    writeln!(output, "{} bytes", inspection.total_len)?;
    writeln!(output, "{:>6}  {:>6}  {:<24}  value", "offset", "width", "field")?;
    for field in &inspection.fields {
        writeln!(
            output,
            "{:>6}  {:>6}  {:<24}  {}",
            field.offset, field.width, field.name, field.value
        )?;
    }
    if inspection.trailing > 0 {
        writeln!(output, "{} trailing bytes ignored", inspection.trailing)?;
    }
    if let Some(err) = &inspection.error {
        writeln!(output, "error: {err}")?;
    }
    Ok(())
}
