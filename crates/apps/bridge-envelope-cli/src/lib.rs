//! Line-oriented front end for `bridge-envelope`.
//!
//! Reads base64 envelopes or JSON envelope records one per line and writes
//! the converted form one per line, so it composes with shell pipelines and
//! stream consumers that hand over raw record text.

pub mod commands;
pub mod config;
pub mod record;

pub use commands::{decode_stream, encode_stream, inspect, StreamSummary};
pub use config::{ContentMode, OnError, ToolConfig};
pub use record::EnvelopeRecord;
