//! Typed validation of resolved configuration.
//!
//! A [`Descriptor`] describes the expected shape of a value and converts it
//! on the way through: `"5"` becomes `5` under [`Descriptor::Integer`], and a
//! [`Dict`] fills in defaults for optional keys that are absent.
//!
//! ```
//! use dragon_config::config::{Descriptor, Dict, Key, Value};
//! use serde_json::json;
//!
//! let schema = Descriptor::from(Dict::new(vec![
//!     Key::new("host", Descriptor::IPv4),
//!     Key::new("port", Descriptor::Integer).with_default(5959),
//! ]));
//! let value = schema.convert(Value::from(json!({"host": "10.0.0.1"}))).unwrap();
//! assert_eq!(value, Value::from(json!({"host": "10.0.0.1", "port": 5959})));
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use super::error::ValidationError;
use super::value::{Map, Value};

/// Rewrites a value found under a key the [`Dict`] does not declare.
pub type KeyMapper = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Accepts anything unchanged.
    Any,
    Boolean,
    Integer,
    Float,
    /// Scalars are rendered as text.
    String,
    /// A string holding a dotted-quad IPv4 address.
    IPv4,
    List(Box<Descriptor>),
    Dict(Dict),
}

impl Descriptor {
    pub fn list(item: Descriptor) -> Self {
        Descriptor::List(Box::new(item))
    }

    /// Checks `value` against this descriptor and returns its converted form.
    pub fn convert(&self, value: Value) -> Result<Value, ValidationError> {
        self.convert_at(value, "")
    }

    fn convert_at(&self, value: Value, path: &str) -> Result<Value, ValidationError> {
        match (self, value) {
            (Descriptor::Any, value) => Ok(value),

            (Descriptor::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
            (Descriptor::Boolean, Value::Integer(i @ (0 | 1))) => Ok(Value::Bool(i == 1)),
            (Descriptor::Boolean, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                    _ => Err(invalid(path, "a boolean", &Value::String(s))),
                }
            }

            (Descriptor::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (Descriptor::Integer, Value::Bool(b)) => Ok(Value::Integer(i64::from(b))),
            (Descriptor::Integer, Value::Float(f))
                if f.is_finite() && f.trunc().abs() < i64::MAX as f64 =>
            {
                Ok(Value::Integer(f.trunc() as i64))
            }
            (Descriptor::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(Value::Integer(i)),
                Err(_) => Err(invalid(path, "an integer", &Value::String(s))),
            },

            (Descriptor::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (Descriptor::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (Descriptor::Float, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => Err(invalid(path, "a float", &Value::String(s))),
            },

            (Descriptor::String, Value::String(s)) => Ok(Value::String(s)),
            (
                Descriptor::String,
                scalar @ (Value::Bool(_) | Value::Integer(_) | Value::Float(_)),
            ) => Ok(Value::String(scalar.to_string())),

            (Descriptor::IPv4, Value::String(s)) => match s.parse::<Ipv4Addr>() {
                Ok(_) => Ok(Value::String(s)),
                Err(_) => Err(invalid(path, "an IPv4 address", &Value::String(s))),
            },

            (Descriptor::List(item), Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, value)| item.convert_at(value, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            (Descriptor::Dict(dict), Value::Map(map)) => {
                dict.convert_map(map, path).map(Value::Map)
            }

            (descriptor, other) => Err(invalid(path, descriptor.expected(), &other)),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Descriptor::Any => "any value",
            Descriptor::Boolean => "a boolean",
            Descriptor::Integer => "an integer",
            Descriptor::Float => "a float",
            Descriptor::String => "a string",
            Descriptor::IPv4 => "an IPv4 address",
            Descriptor::List(_) => "a sequence",
            Descriptor::Dict(_) => "a mapping",
        }
    }
}

impl From<Dict> for Descriptor {
    fn from(dict: Dict) -> Self {
        Descriptor::Dict(dict)
    }
}

#[derive(Debug, Clone)]
enum Presence {
    Required,
    Optional,
    Default(Value),
}

/// A named entry of a [`Dict`].
#[derive(Debug, Clone)]
pub struct Key {
    name: String,
    descriptor: Descriptor,
    presence: Presence,
}

impl Key {
    /// A required key.
    pub fn new(name: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            presence: Presence::Required,
        }
    }

    /// The key may be absent, and is then left out of the result.
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// The key may be absent, and is then set to `default` as given.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.presence = Presence::Default(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A mapping with declared keys.
///
/// Keys the dict does not declare are kept, passed through the unknown-key
/// mapper when one is set.
#[derive(Clone, Default)]
pub struct Dict {
    keys: Vec<Key>,
    unknown_key_mapper: Option<KeyMapper>,
}

impl Dict {
    pub fn new(keys: Vec<Key>) -> Self {
        Self {
            keys,
            unknown_key_mapper: None,
        }
    }

    pub fn with_unknown_key_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str, Value) -> Value + Send + Sync + 'static,
    {
        self.unknown_key_mapper = Some(Arc::new(mapper));
        self
    }

    fn convert_map(&self, mut map: Map, path: &str) -> Result<Map, ValidationError> {
        let mut result = Map::new();
        for key in &self.keys {
            let key_path = join(path, &key.name);
            match (map.remove(&key.name), &key.presence) {
                (Some(value), _) => {
                    let value = key.descriptor.convert_at(value, &key_path)?;
                    result.insert(key.name.clone(), value);
                }
                (None, Presence::Required) => return Err(ValidationError::MissingKey(key_path)),
                (None, Presence::Optional) => {}
                (None, Presence::Default(default)) => {
                    result.insert(key.name.clone(), default.clone());
                }
            }
        }

        for (name, value) in map {
            let value = match &self.unknown_key_mapper {
                Some(mapper) => mapper(&name, value),
                None => value,
            };
            result.insert(name, value);
        }
        Ok(result)
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dict")
            .field("keys", &self.keys)
            .field("unknown_key_mapper", &self.unknown_key_mapper.is_some())
            .finish()
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn invalid(path: &str, expected: &'static str, found: &Value) -> ValidationError {
    ValidationError::Invalid {
        path: if path.is_empty() { "(root)".to_string() } else { path.to_string() },
        expected,
        found: found.type_name(),
    }
}
