//! Sources composed from other sources.

use super::source::{Resolution, Source};
use super::value::{merge_values, Value};
use super::ConfigError;

/// What a merging source does when one of its children fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnFail {
    /// Propagate the first failure.
    #[default]
    Raise,
    /// Log the failure and merge the remaining children.
    Silent,
}

impl OnFail {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "raise" => Some(OnFail::Raise),
            "silent" => Some(OnFail::Silent),
            _ => None,
        }
    }
}

/// Tries its children in order and returns the first one that resolves.
///
/// When every child fails the error carries each cause, in order.
#[derive(Debug)]
pub struct AlternativeSource {
    sources: Vec<Box<dyn Source>>,
}

impl AlternativeSource {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self { sources }
    }
}

impl Source for AlternativeSource {
    fn resolve(&self) -> Resolution {
        let mut causes = Vec::with_capacity(self.sources.len());
        for (index, source) in self.sources.iter().enumerate() {
            match source.resolve() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(index, error = %e, "alternative failed, trying next");
                    causes.push(e);
                }
            }
        }
        Err(ConfigError::AllSourcesFailed(causes))
    }
}

/// Substitutes a default (an empty mapping unless set) when its child fails.
#[derive(Debug)]
pub struct OptionalSource {
    source: Box<dyn Source>,
    default: Value,
}

impl OptionalSource {
    pub fn new(source: Box<dyn Source>) -> Self {
        Self {
            source,
            default: Value::default(),
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

impl Source for OptionalSource {
    fn resolve(&self) -> Resolution {
        match self.source.resolve() {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, "optional source failed, using default");
                Ok(self.default.clone())
            }
        }
    }
}

/// Resolves every child and deep-merges the results left to right.
///
/// Later children override earlier ones. Nested mappings are merged
/// recursively; any other collision is won by the later value.
#[derive(Debug)]
pub struct MergingSource {
    sources: Vec<Box<dyn Source>>,
    on_fail: OnFail,
}

impl MergingSource {
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        Self {
            sources,
            on_fail: OnFail::Raise,
        }
    }

    pub fn with_on_fail(mut self, on_fail: OnFail) -> Self {
        self.on_fail = on_fail;
        self
    }
}

impl Source for MergingSource {
    fn resolve(&self) -> Resolution {
        let mut merged = Value::default();
        for source in &self.sources {
            match source.resolve() {
                Ok(value) => merged = merge_values(merged, value),
                Err(e) if self.on_fail == OnFail::Silent => {
                    tracing::warn!(error = %e, "merged source failed, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvironmentSource, FailureKind, StaticSource};
    use serde_json::json;

    fn fixed(value: serde_json::Value) -> Box<dyn Source> {
        Box::new(StaticSource::new(value))
    }

    fn failing(name: &str) -> Box<dyn Source> {
        Box::new(EnvironmentSource::new(name))
    }

    #[test]
    fn test_alternative_skips_failures() {
        temp_env::with_var_unset("DRAGON_ALT_A", || {
            let source =
                AlternativeSource::new(vec![failing("DRAGON_ALT_A"), fixed(json!({"k": 1}))]);
            assert_eq!(source.resolve().unwrap(), Value::from(json!({"k": 1})));
        });
    }

    #[test]
    fn test_alternative_stops_at_first_success() {
        let source = AlternativeSource::new(vec![fixed(json!({"k": 1})), fixed(json!({"k": 2}))]);
        assert_eq!(source.resolve().unwrap(), Value::from(json!({"k": 1})));
    }

    #[test]
    fn test_alternative_aggregates_causes_in_order() {
        temp_env::with_vars_unset(["DRAGON_ALT_A", "DRAGON_ALT_B"], || {
            let source =
                AlternativeSource::new(vec![failing("DRAGON_ALT_A"), failing("DRAGON_ALT_B")]);
            let err = source.resolve().unwrap_err();
            assert_eq!(err.kind(), FailureKind::Aggregate);

            let ConfigError::AllSourcesFailed(causes) = err else {
                panic!("expected aggregate failure");
            };
            let names: Vec<_> = causes
                .iter()
                .map(|cause| match cause {
                    ConfigError::MissingEnvVar(name) => name.as_str(),
                    other => panic!("unexpected cause {other:?}"),
                })
                .collect();
            assert_eq!(names, ["DRAGON_ALT_A", "DRAGON_ALT_B"]);
        });
    }

    #[test]
    fn test_optional_substitutes_default() {
        temp_env::with_var_unset("DRAGON_OPT", || {
            let source = OptionalSource::new(failing("DRAGON_OPT"));
            assert_eq!(source.resolve().unwrap(), Value::default());

            let source = OptionalSource::new(failing("DRAGON_OPT"))
                .with_default(Value::from(json!({"d": 0})));
            assert_eq!(source.resolve().unwrap(), Value::from(json!({"d": 0})));
        });
    }

    #[test]
    fn test_merging_disjoint_keys() {
        let source = MergingSource::new(vec![fixed(json!({"a": 1})), fixed(json!({"b": 2}))]);
        assert_eq!(source.resolve().unwrap(), Value::from(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_merging_later_wins() {
        let source = MergingSource::new(vec![fixed(json!({"a": 1})), fixed(json!({"a": 2}))]);
        assert_eq!(source.resolve().unwrap(), Value::from(json!({"a": 2})));
    }

    #[test]
    fn test_merging_sequences_are_not_concatenated() {
        let source = MergingSource::new(vec![
            fixed(json!({"hosts": ["a", "b"], "db": {"port": 1, "user": "u"}})),
            fixed(json!({"hosts": ["c"], "db": {"port": 2}})),
        ]);
        assert_eq!(
            source.resolve().unwrap(),
            Value::from(json!({"hosts": ["c"], "db": {"port": 2, "user": "u"}}))
        );
    }

    #[test]
    fn test_merging_fails_fast() {
        temp_env::with_var_unset("DRAGON_MERGE", || {
            let source = MergingSource::new(vec![fixed(json!({"a": 1})), failing("DRAGON_MERGE")]);
            assert!(matches!(source.resolve(), Err(ConfigError::MissingEnvVar(_))));
        });
    }

    #[test]
    fn test_merging_with_optional_child() {
        temp_env::with_var_unset("DRAGON_MERGE", || {
            let source = MergingSource::new(vec![
                fixed(json!({"a": 1})),
                Box::new(OptionalSource::new(failing("DRAGON_MERGE"))),
            ]);
            assert_eq!(source.resolve().unwrap(), Value::from(json!({"a": 1})));
        });
    }

    #[test]
    fn test_merging_silent_skips_failures() {
        temp_env::with_var_unset("DRAGON_MERGE", || {
            let source = MergingSource::new(vec![failing("DRAGON_MERGE"), fixed(json!({"b": 2}))])
                .with_on_fail(OnFail::Silent);
            assert_eq!(source.resolve().unwrap(), Value::from(json!({"b": 2})));
        });
    }
}
