use super::cast::Cast;
use super::value::{Map, Value};
use super::ConfigError;

/// Outcome of resolving a source: the value, or the classified cause of failure.
pub type Resolution = Result<Value, ConfigError>;

/// A unit of configuration retrieval.
///
/// Sources are immutable once built, so a tree of them can be resolved any
/// number of times, from any number of threads.
pub trait Source: Send + Sync + std::fmt::Debug {
    fn resolve(&self) -> Resolution;
}

/// Always resolves to the value it was built with.
#[derive(Debug, Clone)]
pub struct StaticSource {
    value: Value,
}

impl StaticSource {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Source for StaticSource {
    fn resolve(&self) -> Resolution {
        Ok(self.value.clone())
    }
}

/// Applies a cast to everything its child resolves to.
#[derive(Debug)]
pub struct CastSource {
    source: Box<dyn Source>,
    cast: Cast,
}

impl CastSource {
    pub fn new(source: Box<dyn Source>, cast: Cast) -> Self {
        Self { source, cast }
    }
}

impl Source for CastSource {
    fn resolve(&self) -> Resolution {
        let value = self.source.resolve()?;
        Ok(self.cast.apply(value)?)
    }
}

/// Nests whatever its child resolves to under a single key.
#[derive(Debug)]
pub struct BuildObjectFrom {
    key: String,
    source: Box<dyn Source>,
}

impl BuildObjectFrom {
    pub fn new(key: impl Into<String>, source: Box<dyn Source>) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }
}

impl Source for BuildObjectFrom {
    fn resolve(&self) -> Resolution {
        let value = self.source.resolve()?;
        Ok(Value::Map(Map::from([(self.key.clone(), value)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cast::Cast;

    #[test]
    fn test_static_returns_value_unchanged() {
        for value in [
            Value::Null,
            Value::from(3),
            Value::from("text"),
            Value::from(vec![Value::from(1), Value::from(2.5)]),
            Value::from(serde_json::json!({"a": {"b": [true]}})),
        ] {
            let source = StaticSource::new(value.clone());
            assert_eq!(source.resolve().unwrap(), value);
            assert_eq!(source.resolve().unwrap(), value);
        }
    }

    #[test]
    fn test_build_object_from() {
        let source = BuildObjectFrom::new("inner", Box::new(StaticSource::new(5)));
        assert_eq!(
            source.resolve().unwrap(),
            Value::from(serde_json::json!({"inner": 5}))
        );
    }

    #[test]
    fn test_cast_source_applies_to_whole_value() {
        let cast = Cast::lambda("len(x)").unwrap();
        let source = CastSource::new(
            Box::new(StaticSource::new(serde_json::json!({"a": 1, "b": 2}))),
            cast,
        );
        assert_eq!(source.resolve().unwrap(), Value::from(2));
    }

    #[test]
    fn test_cast_failure_is_classified() {
        let cast = Cast::lambda("x + 1").unwrap();
        let source = CastSource::new(Box::new(StaticSource::new("text")), cast);
        let err = source.resolve().unwrap_err();
        assert_eq!(err.kind(), crate::config::FailureKind::Cast);
    }
}
