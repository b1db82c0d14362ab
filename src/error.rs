use crate::config::{ConfigError, SchemaError, ValidationError};
use thiserror::Error;

/// Top-level error type for the dragon-config library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] serde_json::Error),
}
