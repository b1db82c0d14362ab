//! Builds source trees from declarative schemas.
//!
//! A schema node is a JSON mapping whose `type` names a registered source:
//!
//! ```json
//! {
//!   "type": "EnvironmentSource",
//!   "args": ["APP_PORT", "port"],
//!   "cast_to": {"type": "lambda", "operation": "int(x)"},
//!   "optional": true
//! }
//! ```
//!
//! `args` are positional, every other key except `type`, `optional` and
//! `cast_to` is passed by name. Arguments are interpreted recursively, so a
//! source may take other sources (or `lambda`, `binary` and `import`
//! transforms) as arguments. All schema problems are reported by the loader;
//! a source tree that loads never fails for schema reasons when resolved.

mod arguments;
mod registry;

pub use arguments::{Arg, Arguments};
pub use registry::{Constructor, SourceRegistry};

use std::collections::BTreeMap;

use serde_json::Map as JsonMap;

use super::cast::{Cast, FunctionRegistry};
use super::combinator::{MergingSource, OptionalSource};
use super::encoding::Encoding;
use super::error::SchemaError;
use super::source::{CastSource, Source};
use super::value::Value;

/// Raw schema input.
pub type SchemaNode = serde_json::Value;

/// `type` values that denote transforms rather than sources.
pub const TRANSFORM_TYPES: [&str; 3] = ["lambda", "binary", "import"];

const RESERVED_KEYS: [&str; 4] = ["type", "args", "optional", "cast_to"];

/// Interprets schemas against a registry of sources and an allow-list of functions.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    sources: SourceRegistry,
    functions: FunctionRegistry,
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(SourceRegistry::with_builtins(), FunctionRegistry::with_builtins())
    }
}

impl SchemaLoader {
    pub fn new(sources: SourceRegistry, functions: FunctionRegistry) -> Self {
        Self { sources, functions }
    }

    /// The builtin sources with a custom function allow-list.
    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self::new(SourceRegistry::with_builtins(), functions)
    }

    pub fn sources_mut(&mut self) -> &mut SourceRegistry {
        &mut self.sources
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Builds the source described by a single schema mapping.
    pub fn load_source_from_dict(&self, node: &SchemaNode) -> Result<Box<dyn Source>, SchemaError> {
        let object = node
            .as_object()
            .ok_or_else(|| SchemaError::NotAMapping(json_type_name(node)))?;
        let type_name = type_of(object)?.ok_or(SchemaError::MissingType)?;

        if TRANSFORM_TYPES.contains(&type_name) {
            return Err(SchemaError::NotASource(type_name.to_string()));
        }
        let constructor = self
            .sources
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;

        let positional = match object.get("args") {
            None => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| self.load_arg(item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(invalid(type_name, "args", "an array")),
        };

        let optional = match object.get("optional") {
            None => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(_) => return Err(invalid(type_name, "optional", "a boolean")),
        };

        let cast_to = object
            .get("cast_to")
            .map(|node| self.load_cast(node))
            .transpose()?;

        let named = object
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| self.load_arg(value).map(|arg| (key.clone(), arg)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let mut args = Arguments::new(type_name, positional, named, cast_to);
        let mut source = constructor(&mut args)?;

        if let Some(cast) = args.finish()? {
            source = Box::new(CastSource::new(source, cast));
        }
        if optional {
            source = Box::new(OptionalSource::new(source));
        }

        tracing::debug!(source_type = type_name, optional, "loaded source");
        Ok(source)
    }

    /// Builds a source merging every schema in `nodes`, in order.
    pub fn load_source_from_list(
        &self,
        nodes: &[SchemaNode],
    ) -> Result<Box<dyn Source>, SchemaError> {
        let sources = nodes
            .iter()
            .map(|node| self.load_source_from_dict(node))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(MergingSource::new(sources)))
    }

    /// Parses JSON schema text: a mapping loads as one source, an array as a merge.
    pub fn load_source_from_str(&self, text: &str) -> Result<Box<dyn Source>, SchemaError> {
        let node: SchemaNode = serde_json::from_str(text)?;
        match &node {
            SchemaNode::Array(nodes) => self.load_source_from_list(nodes),
            _ => self.load_source_from_dict(&node),
        }
    }

    /// Builds a transform from a `lambda`, `binary` or `import` node.
    pub fn load_cast(&self, node: &SchemaNode) -> Result<Cast, SchemaError> {
        let object = node
            .as_object()
            .ok_or_else(|| SchemaError::NotAMapping(json_type_name(node)))?;
        let type_name = type_of(object)?.ok_or(SchemaError::MissingType)?;
        let mut fields = Fields::new(type_name, object);

        let cast = match type_name {
            "lambda" => Cast::lambda(&fields.require_str("operation")?)?,
            "binary" => {
                let value = fields.str("value")?;
                let encoding = match fields.str("encoding")? {
                    None => Encoding::Ascii,
                    Some(name) => {
                        Encoding::from_name(&name).ok_or(SchemaError::UnknownEncoding(name))?
                    }
                };
                Cast::binary(value, encoding)
            }
            "import" => {
                let module = fields.require_str("module")?;
                let attribute = fields.require_str("attribute")?;
                let cast_before = fields
                    .take("cast_before")
                    .map(|node| self.load_cast(node))
                    .transpose()?;
                Cast::import(&self.functions, &module, &attribute, cast_before)?
            }
            other => {
                return Err(invalid(other, "type", "one of 'lambda', 'binary' or 'import'"));
            }
        };

        fields.finish()?;
        Ok(cast)
    }

    fn load_arg(&self, node: &SchemaNode) -> Result<Arg, SchemaError> {
        match node {
            SchemaNode::Array(items) => items
                .iter()
                .map(|item| self.load_arg(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Arg::List),
            SchemaNode::Object(object) => match type_of(object)? {
                None => Ok(Arg::Value(Value::from(node.clone()))),
                Some(type_name) if TRANSFORM_TYPES.contains(&type_name) => {
                    match self.load_cast(node)? {
                        // A binary literal in argument position is just its bytes.
                        Cast::Binary {
                            value: Some(literal),
                            encoding,
                        } => Ok(Arg::Value(Value::Bytes(encoding.encode(&literal)?))),
                        cast => Ok(Arg::Cast(cast)),
                    }
                }
                Some(_) => self.load_source_from_dict(node).map(Arg::Source),
            },
            scalar => Ok(Arg::Value(Value::from(scalar.clone()))),
        }
    }
}

/// Reads `type`: absent is `None`, present but not a string is an error.
fn type_of(object: &JsonMap<String, SchemaNode>) -> Result<Option<&str>, SchemaError> {
    match object.get("type") {
        None => Ok(None),
        Some(SchemaNode::String(name)) => Ok(Some(name)),
        Some(_) => Err(SchemaError::MissingType),
    }
}

fn invalid(type_name: &str, argument: &str, expected: &'static str) -> SchemaError {
    SchemaError::InvalidArgument {
        type_name: type_name.to_string(),
        argument: argument.to_string(),
        expected,
    }
}

fn json_type_name(node: &SchemaNode) -> &'static str {
    match node {
        SchemaNode::Null => "null",
        SchemaNode::Bool(_) => "bool",
        SchemaNode::Number(_) => "number",
        SchemaNode::String(_) => "string",
        SchemaNode::Array(_) => "array",
        SchemaNode::Object(_) => "object",
    }
}

/// The keyword fields of a transform node, consumed as they are read.
struct Fields<'a> {
    type_name: &'a str,
    remaining: BTreeMap<&'a str, &'a SchemaNode>,
}

impl<'a> Fields<'a> {
    fn new(type_name: &'a str, object: &'a JsonMap<String, SchemaNode>) -> Self {
        Self {
            type_name,
            remaining: object
                .iter()
                .filter(|(key, _)| key.as_str() != "type")
                .map(|(key, value)| (key.as_str(), value))
                .collect(),
        }
    }

    fn take(&mut self, name: &str) -> Option<&'a SchemaNode> {
        self.remaining.remove(name)
    }

    fn str(&mut self, name: &str) -> Result<Option<String>, SchemaError> {
        match self.take(name) {
            None => Ok(None),
            Some(SchemaNode::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid(self.type_name, name, "a string")),
        }
    }

    fn require_str(&mut self, name: &str) -> Result<String, SchemaError> {
        self.str(name)?.ok_or_else(|| SchemaError::MissingArgument {
            type_name: self.type_name.to_string(),
            argument: name.to_string(),
        })
    }

    fn finish(self) -> Result<(), SchemaError> {
        match self.remaining.into_keys().next() {
            None => Ok(()),
            Some(name) => Err(SchemaError::UnexpectedArgument {
                type_name: self.type_name.to_string(),
                argument: name.to_string(),
            }),
        }
    }
}

/// Loads one schema mapping with the builtin sources and functions.
pub fn load_source_from_dict(node: &SchemaNode) -> Result<Box<dyn Source>, SchemaError> {
    SchemaLoader::default().load_source_from_dict(node)
}

/// Loads a list of schema mappings as a merge, with the builtin sources and functions.
pub fn load_source_from_list(nodes: &[SchemaNode]) -> Result<Box<dyn Source>, SchemaError> {
    SchemaLoader::default().load_source_from_list(nodes)
}
