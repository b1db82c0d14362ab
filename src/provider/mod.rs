//! Runtime entry point: resolves a source tree into the application's configuration.

use serde::de::DeserializeOwned;

use crate::config::{
    ConfigError, Descriptor, Map, MergingSource, SchemaLoader, SchemaNode, Source, Value,
};
use crate::Error;

/// Owns a compiled source tree and resolves it on demand.
///
/// Each call to [`provide`](Self::provide) resolves the tree again, so changes
/// to the environment or to files are picked up. The tree itself never
/// changes and may be shared between threads.
///
/// ## Example
///
/// ```no_run
/// use dragon_config::Provider;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct MyConfig {
///     name: String,
///     port: u16,
/// }
///
/// let provider = Provider::builder()
///     .with_schema(json!({"type": "FileSource", "args": ["config/default.toml"]}))
///     .with_schema(json!({
///         "type": "EnvironmentSource",
///         "args": ["MYAPP_PORT", "port"],
///         "cast_to": {"type": "lambda", "operation": "int(x)"},
///         "optional": true
///     }))
///     .build()?;
///
/// let config: MyConfig = provider.extract()?;
/// # Ok::<(), dragon_config::Error>(())
/// ```
#[derive(Debug)]
pub struct Provider {
    source: Box<dyn Source>,
}

impl Provider {
    /// Creates a new builder for constructing a `Provider`.
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    pub fn new(source: Box<dyn Source>) -> Self {
        Self { source }
    }

    /// Loads a single schema with the builtin sources and functions.
    pub fn from_schema(schema: &SchemaNode) -> Result<Self, Error> {
        Ok(Self::new(SchemaLoader::default().load_source_from_dict(schema)?))
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    /// Resolves the source tree. The result must be a mapping.
    pub fn provide(&self) -> Result<Map, ConfigError> {
        self.source
            .resolve()?
            .into_map()
            .map_err(|other| ConfigError::NotAMapping(other.type_name()))
    }

    /// Resolves the source tree and converts it through `descriptor`.
    pub fn provide_validated(&self, descriptor: &Descriptor) -> Result<Map, Error> {
        let value = descriptor.convert(Value::Map(self.provide()?))?;
        value
            .into_map()
            .map_err(|other| ConfigError::NotAMapping(other.type_name()).into())
    }

    /// Resolves the source tree and deserializes it into `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value = serde_json::to_value(Value::Map(self.provide()?))?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug)]
enum Input {
    Schema(SchemaNode),
    Source(Box<dyn Source>),
}

/// Builder for a [`Provider`].
///
/// Schemas and sources are merged in registration order, later ones
/// overriding earlier ones.
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ProviderBuilder {
    loader: Option<SchemaLoader>,
    inputs: Vec<Input>,
}

impl ProviderBuilder {
    /// Uses `loader` instead of the builtin sources and functions.
    pub fn with_loader(mut self, loader: SchemaLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_schema(mut self, schema: SchemaNode) -> Self {
        self.inputs.push(Input::Schema(schema));
        self
    }

    pub fn with_source(mut self, source: Box<dyn Source>) -> Self {
        self.inputs.push(Input::Source(source));
        self
    }

    /// Loads every schema and builds the `Provider`.
    ///
    /// Schema errors surface here, before anything is resolved.
    pub fn build(self) -> Result<Provider, Error> {
        let loader = self.loader.unwrap_or_default();
        let mut sources = self
            .inputs
            .into_iter()
            .map(|input| match input {
                Input::Schema(schema) => loader.load_source_from_dict(&schema),
                Input::Source(source) => Ok(source),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let source: Box<dyn Source> = if sources.len() == 1 {
            sources.remove(0)
        } else {
            Box::new(MergingSource::new(sources))
        };
        Ok(Provider::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailureKind, StaticSource};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct AppConfig {
        name: String,
        port: u16,
        #[serde(default)]
        debug: bool,
    }

    #[test]
    fn test_extract_typed_config() {
        let provider = Provider::builder()
            .with_schema(json!({"type": "StaticSource", "args": [{"name": "app", "port": 80}]}))
            .with_source(Box::new(StaticSource::new(json!({"port": 8080}))))
            .build()
            .unwrap();

        let config: AppConfig = provider.extract().unwrap();
        assert_eq!(
            config,
            AppConfig {
                name: "app".into(),
                port: 8080,
                debug: false
            }
        );
    }

    #[test]
    fn test_schema_error_at_build() {
        let result = Provider::builder()
            .with_schema(json!({"type": "Unregistered"}))
            .build();
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_non_mapping_result() {
        let provider = Provider::new(Box::new(StaticSource::new("scalar")));
        let err = provider.provide().unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping("string")));
        assert_eq!(err.kind(), FailureKind::Source);
    }

    #[test]
    fn test_empty_builder_provides_empty_map() {
        let provider = Provider::builder().build().unwrap();
        assert!(provider.provide().unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_error() {
        let provider =
            Provider::from_schema(&json!({"type": "StaticSource", "args": [{"name": "app"}]}))
                .unwrap();
        assert!(matches!(
            provider.extract::<AppConfig>(),
            Err(Error::Deserialize(_))
        ));
    }

    #[test]
    fn test_provide_validated() {
        use crate::config::{Dict, Key};

        let provider = Provider::from_schema(&json!({
            "type": "StaticSource",
            "args": [{"name": "app", "port": "8080"}]
        }))
        .unwrap();
        let schema = Descriptor::from(Dict::new(vec![
            Key::new("name", Descriptor::String),
            Key::new("port", Descriptor::Integer),
            Key::new("debug", Descriptor::Boolean).with_default(false),
        ]));

        let map = provider.provide_validated(&schema).unwrap();
        assert_eq!(map["port"], Value::from(8080));
        assert_eq!(map["debug"], Value::from(false));

        let strict = Descriptor::from(Dict::new(vec![Key::new("missing", Descriptor::Any)]));
        assert!(matches!(
            provider.provide_validated(&strict),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_from_many_threads() {
        let provider = Provider::from_schema(&json!({
            "type": "MergingSource",
            "args": [
                {"type": "StaticSource", "args": [{"a": 1}]},
                {
                    "type": "StaticSource",
                    "args": [{"b": "2"}],
                    "cast_to": {"type": "lambda", "operation": "x"}
                }
            ]
        }))
        .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let map = provider.provide().unwrap();
                    assert_eq!(map["a"], Value::from(1));
                    assert_eq!(map["b"], Value::from("2"));
                });
            }
        });
    }
}
