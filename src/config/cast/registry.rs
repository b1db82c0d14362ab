use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::error::CastError;
use crate::config::value::Value;

/// A function `import` casts may call.
pub type Function = Arc<dyn Fn(Value) -> Result<Value, CastError> + Send + Sync>;

/// The allow-list of functions reachable from `import` casts, keyed by module and attribute.
///
/// Nothing outside this registry can be named from a schema.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<(String, String), Function>,
}

impl FunctionRegistry {
    /// An empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// An allow-list holding the `builtins` module: `int`, `float`, `str` and `bool`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("builtins", "int", to_int);
        registry.register("builtins", "float", to_float);
        registry.register("builtins", "str", |v: Value| Ok(Value::String(v.to_string())));
        registry.register("builtins", "bool", to_bool);
        registry
    }

    /// Adds or replaces `module.attribute`.
    pub fn register<F>(&mut self, module: &str, attribute: &str, function: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        self.functions.insert(
            (module.to_string(), attribute.to_string()),
            Arc::new(function),
        );
        self
    }

    pub fn get(&self, module: &str, attribute: &str) -> Result<Function, CastError> {
        self.functions
            .get(&(module.to_string(), attribute.to_string()))
            .cloned()
            .ok_or_else(|| CastError::UnknownFunction {
                module: module.to_string(),
                attribute: attribute.to_string(),
            })
    }

    pub fn contains(&self, module: &str, attribute: &str) -> bool {
        self.functions
            .contains_key(&(module.to_string(), attribute.to_string()))
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .functions
            .keys()
            .map(|(module, attribute)| format!("{module}.{attribute}"))
            .collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

fn to_int(value: Value) -> Result<Value, CastError> {
    match value {
        Value::Integer(i) => Ok(Value::Integer(i)),
        Value::Bool(b) => Ok(Value::Integer(i64::from(b))),
        Value::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
            Ok(Value::Integer(f.trunc() as i64))
        }
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Integer)
            .map_err(|_| CastError::function("builtins.int", format!("invalid integer '{s}'"))),
        other => Err(CastError::function(
            "builtins.int",
            format!("cannot convert {} to integer", other.type_name()),
        )),
    }
}

fn to_float(value: Value) -> Result<Value, CastError> {
    match value {
        Value::Integer(i) => Ok(Value::Float(i as f64)),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| CastError::function("builtins.float", format!("invalid float '{s}'"))),
        other => Err(CastError::function(
            "builtins.float",
            format!("cannot convert {} to float", other.type_name()),
        )),
    }
}

/// Strings are parsed leniently (`true`/`yes`/`on`/`1`); other values use truthiness.
fn to_bool(value: Value) -> Result<Value, CastError> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
            _ => Err(CastError::function(
                "builtins.bool",
                format!("invalid boolean '{s}'"),
            )),
        },
        other => Ok(Value::Bool(other.is_truthy())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = FunctionRegistry::with_builtins();
        let int = registry.get("builtins", "int").unwrap();
        assert_eq!(int(Value::from(" 12 ")).unwrap(), Value::from(12));
        assert!(int(Value::from("1.5")).is_err());

        let boolean = registry.get("builtins", "bool").unwrap();
        assert_eq!(boolean(Value::from("Yes")).unwrap(), Value::from(true));
        assert_eq!(boolean(Value::from(0)).unwrap(), Value::from(false));
        assert!(boolean(Value::from("maybe")).is_err());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FunctionRegistry::new();
        registry.register("text", "shout", |v: Value| {
            Ok(Value::String(format!("{}!", v).to_uppercase()))
        });

        assert!(registry.contains("text", "shout"));
        let shout = registry.get("text", "shout").unwrap();
        assert_eq!(shout(Value::from("hey")).unwrap(), Value::from("HEY!"));
        assert!(matches!(
            registry.get("text", "whisper"),
            Err(CastError::UnknownFunction { .. })
        ));
    }
}
