use std::path::PathBuf;
use thiserror::Error;

use super::format::Format;

/// Broad classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A source could not produce its value.
    Source,
    /// The casting pipeline rejected a value.
    Cast,
    /// Every branch of an alternative failed.
    Aggregate,
}

/// Failure raised while resolving a source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("environment variable {0} is not valid unicode")]
    NonUnicodeEnvVar(String),

    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode config file '{path}' as {encoding}")]
    DecodeError { path: PathBuf, encoding: String },

    #[error("failed to parse config file '{path}' as {format}: {message}")]
    ParseError {
        path: PathBuf,
        format: Format,
        message: String,
    },

    #[error("no enabled format could parse config file '{0}' into a mapping")]
    UnrecognizedFormat(PathBuf),

    #[error("failed to parse {format} text: {message}")]
    TextParseError { format: Format, message: String },

    #[error("config directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("failed to list config directory '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("configuration must be a mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("cast failed: {0}")]
    Cast(#[from] CastError),

    #[error("all {} alternative sources failed", .0.len())]
    AllSourcesFailed(Vec<ConfigError>),
}

impl ConfigError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConfigError::Cast(_) => FailureKind::Cast,
            ConfigError::AllSourcesFailed(_) => FailureKind::Aggregate,
            _ => FailureKind::Source,
        }
    }
}

/// A resolved value that does not match its descriptor.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required key '{0}'")]
    MissingKey(String),

    #[error("'{path}' should be {expected}, got {found}")]
    Invalid {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Failure inside the casting pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CastError {
    #[error("function '{module}.{attribute}' is not in the allow-list")]
    UnknownFunction { module: String, attribute: String },

    #[error("expression '{expression}' failed: {message}")]
    Eval { expression: String, message: String },

    #[error("cannot encode value as {encoding}: {message}")]
    Encoding { encoding: String, message: String },

    #[error("'{function}' failed: {message}")]
    Function { function: String, message: String },
}

impl CastError {
    /// Error for allow-listed functions that reject their input.
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        CastError::Function {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Malformed schema, reported while loading and never at resolve time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("schema node must be a mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("schema node has no string 'type' field")]
    MissingType,

    #[error("unknown source type: {0}")]
    UnknownType(String),

    #[error("'{0}' is a transform and cannot be used as a source")]
    NotASource(String),

    #[error("'{type_name}' requires argument '{argument}'")]
    MissingArgument { type_name: String, argument: String },

    #[error("'{type_name}' got unexpected argument '{argument}'")]
    UnexpectedArgument { type_name: String, argument: String },

    #[error("'{type_name}' got argument '{argument}' both by position and by name")]
    DuplicateArgument { type_name: String, argument: String },

    #[error("'{type_name}' argument '{argument}' must be {expected}")]
    InvalidArgument {
        type_name: String,
        argument: String,
        expected: &'static str,
    },

    #[error("invalid expression '{expression}': {message}")]
    Expression { expression: String, message: String },

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
}
