use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_LOG_FILTER: &str = "warn";

/// What to do with a record that fails to decode or encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Log the failure and continue with the next record.
    Skip,
    /// Stop at the first failure and exit non-zero.
    #[default]
    Halt,
}

/// How content bodies are rendered as JSON, and read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// UTF-8 text string.
    #[default]
    Utf8,
    /// Standard base64 string; works for any payload.
    Base64,
    /// Embedded JSON value.
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    pub on_error: OnError,
    pub content: ContentMode,
    pub log_level: Option<String>,
}

impl ToolConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    /// Command-line flags win over file values.
    pub fn with_overrides(mut self, on_error: Option<OnError>, content: Option<ContentMode>) -> Self {
        if let Some(on_error) = on_error {
            self.on_error = on_error;
        }
        if let Some(content) = content {
            self.content = content;
        }
        self
    }

    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
