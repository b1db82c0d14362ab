use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::arguments::Arguments;
use super::TRANSFORM_TYPES;
use crate::config::combinator::{AlternativeSource, MergingSource, OnFail, OptionalSource};
use crate::config::encoding::Encoding;
use crate::config::env::{EnvVarsSource, EnvironmentSource};
use crate::config::error::SchemaError;
use crate::config::file::{DirectorySource, FileSource};
use crate::config::format::{Format, Formats, TextSource};
use crate::config::source::{BuildObjectFrom, Source, StaticSource};

/// Builds a source from the arguments of a schema node.
pub type Constructor =
    Arc<dyn Fn(&mut Arguments) -> Result<Box<dyn Source>, SchemaError> + Send + Sync>;

/// Maps schema `type` names to source constructors.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    constructors: HashMap<String, Constructor>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every source this crate provides.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("StaticSource", static_source)
            .register("EnvironmentSource", environment_source)
            .register("EnvVarsSource", env_vars_source)
            .register("FileSource", file_source)
            .register("DirectorySource", directory_source)
            .register("AlternativeSource", alternative_source)
            .register("OptionalSource", optional_source)
            .register("MergingSource", merging_source)
            .register("BuildObjectFrom", build_object_from)
            .register("JSONSource", |args: &mut Arguments| text_source(args, Format::Json))
            .register("YAMLSource", |args: &mut Arguments| text_source(args, Format::Yaml))
            .register("TOMLSource", |args: &mut Arguments| text_source(args, Format::Toml));
        registry
    }

    /// Adds or replaces the constructor for `name`.
    ///
    /// # Panics
    ///
    /// If `name` is one of the reserved transform types.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&mut Arguments) -> Result<Box<dyn Source>, SchemaError> + Send + Sync + 'static,
    {
        assert!(
            !TRANSFORM_TYPES.contains(&name),
            "'{name}' is reserved for transforms"
        );
        self.constructors
            .insert(name.to_string(), Arc::new(constructor));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Constructor> {
        self.constructors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("SourceRegistry")
            .field("types", &names)
            .finish()
    }
}

fn static_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let config = args.require_value(0, "config")?;
    Ok(Box::new(StaticSource::new(config)))
}

fn environment_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let mut source = EnvironmentSource::new(args.require_string(0, "env_name")?);
    if let Some(config_name) = args.string(1, "config_name")? {
        source = source.with_config_name(config_name);
    }
    if let Some(default) = args.value(2, "default")? {
        source = source.with_default(default);
    }
    if let Some(cast) = args.take_cast_to() {
        source = source.with_cast(cast);
    }
    Ok(Box::new(source))
}

fn env_vars_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let mut source = EnvVarsSource::new(args.strings(0, "names")?);
    if let Some(cast) = args.take_cast_to() {
        source = source.with_cast(cast);
    }
    Ok(Box::new(source))
}

fn file_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let source = FileSource::new(args.require_string(0, "path")?)
        .with_encoding(encoding(args, 1)?)
        .with_formats(formats(args, 2)?);
    Ok(Box::new(source))
}

fn directory_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let mut source = DirectorySource::new(args.require_string(0, "path")?)
        .with_encoding(encoding(args, 1)?)
        .with_formats(formats(args, 2)?)
        .with_on_fail(on_fail(args, 4)?);
    if let Some(scan) = args.bool(3, "scan_subdirectories")? {
        source = source.scan_subdirectories(scan);
    }
    Ok(Box::new(source))
}

fn alternative_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    Ok(Box::new(AlternativeSource::new(args.sources(0, "sources")?)))
}

fn optional_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let mut source = OptionalSource::new(args.require_source(0, "source")?);
    if let Some(default) = args.value(1, "default")? {
        source = source.with_default(default);
    }
    Ok(Box::new(source))
}

fn merging_source(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    // Positional arguments are all sources, so the policy is keyword-only.
    let on_fail = on_fail(args, usize::MAX)?;
    let sources = args.sources(0, "sources")?;
    Ok(Box::new(MergingSource::new(sources).with_on_fail(on_fail)))
}

fn build_object_from(args: &mut Arguments) -> Result<Box<dyn Source>, SchemaError> {
    let key = args.require_string(0, "key")?;
    let source = args.require_source(1, "source")?;
    Ok(Box::new(BuildObjectFrom::new(key, source)))
}

fn text_source(args: &mut Arguments, format: Format) -> Result<Box<dyn Source>, SchemaError> {
    let text = args.require_string(0, "text")?;
    Ok(Box::new(TextSource::new(text, format)))
}

fn encoding(args: &mut Arguments, index: usize) -> Result<Encoding, SchemaError> {
    match args.string(index, "encoding")? {
        None => Ok(Encoding::Utf8),
        Some(name) => Encoding::from_name(&name).ok_or(SchemaError::UnknownEncoding(name)),
    }
}

fn formats(args: &mut Arguments, index: usize) -> Result<Formats, SchemaError> {
    let Some(value) = args.value(index, "formats")? else {
        return Ok(Formats::default());
    };
    let names = match value {
        crate::config::Value::Array(items) => items,
        _ => return Err(args.invalid("formats", "a list of format names")),
    };
    names
        .iter()
        .map(|name| name.as_str().and_then(Format::from_name))
        .collect::<Option<Vec<_>>>()
        .map(|list| Formats::only(&list))
        .ok_or_else(|| args.invalid("formats", "a list of format names"))
}

fn on_fail(args: &mut Arguments, index: usize) -> Result<OnFail, SchemaError> {
    match args.string(index, "on_fail")? {
        None => Ok(OnFail::Raise),
        Some(name) => {
            OnFail::from_name(&name).ok_or_else(|| args.invalid("on_fail", "'raise' or 'silent'"))
        }
    }
}
