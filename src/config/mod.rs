//! Configuration sources, their composition, and the schema loader that builds them.

mod combinator;
mod descriptor;
mod encoding;
mod env;
mod error;
mod file;
mod format;
mod source;
mod value;

pub mod cast;
pub mod schema;

pub use cast::{Cast, FunctionRegistry};
pub use combinator::{AlternativeSource, MergingSource, OnFail, OptionalSource};
pub use descriptor::{Descriptor, Dict, Key, KeyMapper};
pub use encoding::Encoding;
pub use env::{EnvVarsSource, EnvironmentSource};
pub use error::{CastError, ConfigError, FailureKind, SchemaError, ValidationError};
pub use file::{DirectorySource, FileSource};
pub use format::{Format, Formats, TextSource};
pub use schema::{load_source_from_dict, load_source_from_list, SchemaLoader, SchemaNode};
pub use source::{BuildObjectFrom, CastSource, Resolution, Source, StaticSource};
pub use value::{deep_merge, merge_values, Map, Value};
