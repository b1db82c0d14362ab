use std::env::VarError;

use super::cast::Cast;
use super::source::{Resolution, Source};
use super::value::{Map, Value};
use super::ConfigError;

/// Reads a single environment variable into `{config_name: value}`.
///
/// The key defaults to the variable name. A missing variable falls back to
/// the default when one is set, and fails otherwise. The cast, if any, is
/// applied to the raw string read from the environment.
#[derive(Debug)]
pub struct EnvironmentSource {
    env_name: String,
    config_name: String,
    default: Option<Value>,
    cast: Option<Cast>,
}

impl EnvironmentSource {
    pub fn new(env_name: impl Into<String>) -> Self {
        let env_name = env_name.into();
        Self {
            config_name: env_name.clone(),
            env_name,
            default: None,
            cast: None,
        }
    }

    /// Stores the value under `config_name` instead of the variable name.
    pub fn with_config_name(mut self, config_name: impl Into<String>) -> Self {
        self.config_name = config_name.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_cast(mut self, cast: Cast) -> Self {
        self.cast = Some(cast);
        self
    }
}

impl Source for EnvironmentSource {
    fn resolve(&self) -> Resolution {
        let value = match (read_var(&self.env_name, self.cast.as_ref()), &self.default) {
            (Ok(value), _) => value,
            (Err(ConfigError::MissingEnvVar(_)), Some(default)) => default.clone(),
            (Err(e), _) => return Err(e),
        };
        Ok(Value::Map(Map::from([(self.config_name.clone(), value)])))
    }
}

/// Reads a fixed set of environment variables into `{name: value}`.
///
/// All variables must be present; a single missing one fails the source.
#[derive(Debug)]
pub struct EnvVarsSource {
    names: Vec<String>,
    cast: Option<Cast>,
}

impl EnvVarsSource {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            cast: None,
        }
    }

    pub fn with_cast(mut self, cast: Cast) -> Self {
        self.cast = Some(cast);
        self
    }
}

impl Source for EnvVarsSource {
    fn resolve(&self) -> Resolution {
        let mut map = Map::new();
        for name in &self.names {
            map.insert(name.clone(), read_var(name, self.cast.as_ref())?);
        }
        Ok(Value::Map(map))
    }
}

fn read_var(name: &str, cast: Option<&Cast>) -> Resolution {
    let raw = std::env::var(name).map_err(|e| match e {
        VarError::NotPresent => ConfigError::MissingEnvVar(name.to_string()),
        VarError::NotUnicode(_) => ConfigError::NonUnicodeEnvVar(name.to_string()),
    })?;
    tracing::debug!(variable = name, "read environment variable");
    match cast {
        Some(cast) => Ok(cast.apply(Value::String(raw))?),
        None => Ok(Value::String(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailureKind;

    #[test]
    fn test_environment_reads_variable() {
        temp_env::with_var("DRAGON_TEST_HOST", Some("db.local"), || {
            let source = EnvironmentSource::new("DRAGON_TEST_HOST").with_config_name("host");
            assert_eq!(
                source.resolve().unwrap(),
                Value::from(serde_json::json!({"host": "db.local"}))
            );
        });
    }

    #[test]
    fn test_environment_missing_without_default() {
        temp_env::with_var_unset("DRAGON_TEST_MISSING", || {
            let err = EnvironmentSource::new("DRAGON_TEST_MISSING")
                .resolve()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::MissingEnvVar(ref name) if name == "DRAGON_TEST_MISSING")
            );
            assert_eq!(err.kind(), FailureKind::Source);
        });
    }

    #[test]
    fn test_environment_missing_uses_default() {
        temp_env::with_var_unset("DRAGON_TEST_PORT", || {
            let source = EnvironmentSource::new("DRAGON_TEST_PORT").with_default(8080);
            assert_eq!(
                source.resolve().unwrap(),
                Value::from(serde_json::json!({"DRAGON_TEST_PORT": 8080}))
            );
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_environment_non_unicode_does_not_use_default() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(&[b'8', 0xff]);
        temp_env::with_var("DRAGON_TEST_RAW_PORT", Some(raw), || {
            let source = EnvironmentSource::new("DRAGON_TEST_RAW_PORT").with_default(8080);
            let err = source.resolve().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::NonUnicodeEnvVar(ref name) if name == "DRAGON_TEST_RAW_PORT"
            ));
            assert_eq!(err.kind(), FailureKind::Source);
        });
    }

    #[test]
    fn test_environment_cast_applies_to_raw_value() {
        temp_env::with_var("DRAGON_TEST_WORKERS", Some("3"), || {
            let source = EnvironmentSource::new("DRAGON_TEST_WORKERS")
                .with_cast(Cast::lambda("int(x) * 2").unwrap());
            assert_eq!(
                source.resolve().unwrap(),
                Value::from(serde_json::json!({"DRAGON_TEST_WORKERS": 6}))
            );
        });
    }

    #[test]
    fn test_env_vars_all_present() {
        temp_env::with_vars([("DRAGON_X", Some("1")), ("DRAGON_Y", Some("2"))], || {
            let source = EnvVarsSource::new(["DRAGON_X", "DRAGON_Y"]);
            assert_eq!(
                source.resolve().unwrap(),
                Value::from(serde_json::json!({"DRAGON_X": "1", "DRAGON_Y": "2"}))
            );
        });
    }

    #[test]
    fn test_env_vars_one_missing_fails() {
        temp_env::with_vars([("DRAGON_X", Some("1")), ("DRAGON_Y", None)], || {
            let err = EnvVarsSource::new(["DRAGON_X", "DRAGON_Y"])
                .resolve()
                .unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "DRAGON_Y"));
        });
    }
}
