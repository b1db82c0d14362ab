//! Parsers for the configuration file formats and the set of them a source may use.

use std::fmt;
use std::path::Path;

use super::source::{Resolution, Source};
use super::value::Value;
use super::ConfigError;

/// A configuration text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Every format, in the order they are tried when the extension does not decide.
    pub const PRIORITY: [Format; 3] = [Format::Json, Format::Yaml, Format::Toml];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }

    /// Parses `text` into a value tree.
    pub fn parse(&self, text: &str) -> Result<Value, String> {
        match self {
            Format::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(text)
                .map(Value::from)
                .map_err(|e| e.to_string()),
            Format::Toml => toml::from_str::<toml::Table>(text)
                .map(|table| Value::from(toml::Value::Table(table)))
                .map_err(|e| e.to_string()),
        }
    }

    /// Parses `text`, accepting only a mapping at the top level.
    pub fn parse_mapping(&self, text: &str) -> Result<Value, String> {
        let value = self.parse(text)?;
        if value.is_map() {
            Ok(value)
        } else {
            Err(format!("expected a mapping, got {}", value.type_name()))
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
            Format::Toml => "TOML",
        })
    }
}

/// The formats a file source is allowed to parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formats {
    pub json: bool,
    pub yaml: bool,
    pub toml: bool,
}

impl Formats {
    pub const ALL: Formats = Formats {
        json: true,
        yaml: true,
        toml: true,
    };

    pub const NONE: Formats = Formats {
        json: false,
        yaml: false,
        toml: false,
    };

    pub fn only(formats: &[Format]) -> Self {
        formats.iter().fold(Self::NONE, |acc, f| acc.with(*f))
    }

    pub fn with(mut self, format: Format) -> Self {
        match format {
            Format::Json => self.json = true,
            Format::Yaml => self.yaml = true,
            Format::Toml => self.toml = true,
        }
        self
    }

    pub fn contains(&self, format: Format) -> bool {
        match format {
            Format::Json => self.json,
            Format::Yaml => self.yaml,
            Format::Toml => self.toml,
        }
    }

    /// Enabled formats in priority order.
    pub fn enabled(&self) -> impl Iterator<Item = Format> + '_ {
        Format::PRIORITY.into_iter().filter(|f| self.contains(*f))
    }
}

impl Default for Formats {
    fn default() -> Self {
        Self::ALL
    }
}

/// Parses a literal piece of text in a single format.
#[derive(Debug, Clone)]
pub struct TextSource {
    text: String,
    format: Format,
}

impl TextSource {
    pub fn new(text: impl Into<String>, format: Format) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

impl Source for TextSource {
    fn resolve(&self) -> Resolution {
        self.format
            .parse(&self.text)
            .map_err(|message| ConfigError::TextParseError {
                format: self.format,
                message,
            })
    }
}
