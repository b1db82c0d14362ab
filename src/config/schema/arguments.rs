use std::collections::BTreeMap;

use crate::config::cast::Cast;
use crate::config::error::SchemaError;
use crate::config::source::Source;
use crate::config::value::Value;

/// A schema argument after interpretation.
#[derive(Debug)]
pub enum Arg {
    /// A literal: scalar, typeless mapping, or a `binary` node with a literal `value`.
    Value(Value),
    /// A nested source.
    Source(Box<dyn Source>),
    /// A nested transform.
    Cast(Cast),
    /// A sequence whose elements were interpreted one by one.
    List(Vec<Arg>),
}

impl Arg {
    /// Collapses literals (and lists of literals) into a value.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::List(items) => items
                .into_iter()
                .map(Arg::into_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Arg::Source(_) | Arg::Cast(_) => None,
        }
    }
}

/// The arguments of one schema node, consumed by a source constructor.
///
/// Every parameter can be given by position (in `args`) or by name. Whatever
/// the constructor leaves untouched is reported as unexpected once it returns.
#[derive(Debug)]
pub struct Arguments {
    type_name: String,
    positional: Vec<Option<Arg>>,
    named: BTreeMap<String, Arg>,
    cast_to: Option<Cast>,
}

impl Arguments {
    pub fn new(
        type_name: impl Into<String>,
        positional: Vec<Arg>,
        named: BTreeMap<String, Arg>,
        cast_to: Option<Cast>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            positional: positional.into_iter().map(Some).collect(),
            named,
            cast_to,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Takes the parameter at `index` or called `name`.
    pub fn take(&mut self, index: usize, name: &str) -> Result<Option<Arg>, SchemaError> {
        let by_position = self.positional.get_mut(index).and_then(Option::take);
        let by_name = self.named.remove(name);
        match (by_position, by_name) {
            (Some(_), Some(_)) => Err(SchemaError::DuplicateArgument {
                type_name: self.type_name.clone(),
                argument: name.to_string(),
            }),
            (arg, None) | (None, arg) => Ok(arg),
        }
    }

    pub fn require(&mut self, index: usize, name: &str) -> Result<Arg, SchemaError> {
        self.take(index, name)?.ok_or_else(|| self.missing(name))
    }

    /// Takes the positional parameters from `from` onwards plus the sequence called `name`.
    pub fn take_rest(&mut self, from: usize, name: &str) -> Vec<Arg> {
        let mut rest: Vec<Arg> = self
            .positional
            .iter_mut()
            .skip(from)
            .filter_map(Option::take)
            .collect();
        match self.named.remove(name) {
            Some(Arg::List(items)) => rest.extend(items),
            Some(arg) => rest.push(arg),
            None => {}
        }
        rest
    }

    /// Takes `cast_to` for constructors that apply it themselves.
    pub fn take_cast_to(&mut self) -> Option<Cast> {
        self.cast_to.take()
    }

    pub fn string(&mut self, index: usize, name: &str) -> Result<Option<String>, SchemaError> {
        match self.take(index, name)? {
            None => Ok(None),
            Some(Arg::Value(Value::String(s))) => Ok(Some(s)),
            Some(_) => Err(self.invalid(name, "a string")),
        }
    }

    pub fn require_string(&mut self, index: usize, name: &str) -> Result<String, SchemaError> {
        self.string(index, name)?.ok_or_else(|| self.missing(name))
    }

    pub fn bool(&mut self, index: usize, name: &str) -> Result<Option<bool>, SchemaError> {
        match self.take(index, name)? {
            None => Ok(None),
            Some(Arg::Value(Value::Bool(b))) => Ok(Some(b)),
            Some(_) => Err(self.invalid(name, "a boolean")),
        }
    }

    pub fn value(&mut self, index: usize, name: &str) -> Result<Option<Value>, SchemaError> {
        match self.take(index, name)? {
            None => Ok(None),
            Some(arg) => arg
                .into_value()
                .map(Some)
                .ok_or_else(|| self.invalid(name, "a literal value")),
        }
    }

    pub fn require_value(&mut self, index: usize, name: &str) -> Result<Value, SchemaError> {
        self.value(index, name)?.ok_or_else(|| self.missing(name))
    }

    pub fn require_source(
        &mut self,
        index: usize,
        name: &str,
    ) -> Result<Box<dyn Source>, SchemaError> {
        match self.require(index, name)? {
            Arg::Source(source) => Ok(source),
            _ => Err(self.invalid(name, "a source")),
        }
    }

    /// Variadic sources: positional from `from` onwards, or a list called `name`.
    pub fn sources(
        &mut self,
        from: usize,
        name: &str,
    ) -> Result<Vec<Box<dyn Source>>, SchemaError> {
        self.take_rest(from, name)
            .into_iter()
            .map(|arg| match arg {
                Arg::Source(source) => Ok(source),
                _ => Err(self.invalid(name, "a list of sources")),
            })
            .collect()
    }

    /// Variadic strings: positional from `from` onwards, or a list called `name`.
    pub fn strings(&mut self, from: usize, name: &str) -> Result<Vec<String>, SchemaError> {
        let mut strings = Vec::new();
        for arg in self.take_rest(from, name) {
            match arg {
                Arg::Value(Value::String(s)) => strings.push(s),
                Arg::List(items) => {
                    for item in items {
                        match item {
                            Arg::Value(Value::String(s)) => strings.push(s),
                            _ => return Err(self.invalid(name, "a list of strings")),
                        }
                    }
                }
                _ => return Err(self.invalid(name, "a list of strings")),
            }
        }
        Ok(strings)
    }

    /// Rejects anything left unconsumed and hands back `cast_to` if no one took it.
    pub fn finish(self) -> Result<Option<Cast>, SchemaError> {
        if let Some(index) = self.positional.iter().position(Option::is_some) {
            return Err(SchemaError::UnexpectedArgument {
                type_name: self.type_name,
                argument: format!("args[{index}]"),
            });
        }
        if let Some(name) = self.named.into_keys().next() {
            return Err(SchemaError::UnexpectedArgument {
                type_name: self.type_name,
                argument: name,
            });
        }
        Ok(self.cast_to)
    }

    pub fn missing(&self, name: &str) -> SchemaError {
        SchemaError::MissingArgument {
            type_name: self.type_name.clone(),
            argument: name.to_string(),
        }
    }

    pub fn invalid(&self, name: &str, expected: &'static str) -> SchemaError {
        SchemaError::InvalidArgument {
            type_name: self.type_name.clone(),
            argument: name.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Arg {
        Arg::Value(Value::from(s))
    }

    #[test]
    fn test_take_by_position_or_name() {
        let mut args = Arguments::new(
            "T",
            vec![string("a")],
            BTreeMap::from([("second".to_string(), string("b"))]),
            None,
        );
        assert_eq!(args.require_string(0, "first").unwrap(), "a");
        assert_eq!(args.require_string(1, "second").unwrap(), "b");
        assert!(args.finish().unwrap().is_none());
    }

    #[test]
    fn test_duplicate_argument() {
        let mut args = Arguments::new(
            "T",
            vec![string("a")],
            BTreeMap::from([("first".to_string(), string("b"))]),
            None,
        );
        assert!(matches!(
            args.string(0, "first"),
            Err(SchemaError::DuplicateArgument { .. })
        ));
    }

    #[test]
    fn test_leftovers_are_unexpected() {
        let args = Arguments::new("T", vec![string("a")], BTreeMap::new(), None);
        assert!(matches!(
            args.finish(),
            Err(SchemaError::UnexpectedArgument { ref argument, .. }) if argument == "args[0]"
        ));

        let args = Arguments::new(
            "T",
            vec![],
            BTreeMap::from([("extra".to_string(), string("x"))]),
            None,
        );
        assert!(matches!(
            args.finish(),
            Err(SchemaError::UnexpectedArgument { ref argument, .. }) if argument == "extra"
        ));
    }

    #[test]
    fn test_strings_flattens_lists() {
        let mut args = Arguments::new(
            "T",
            vec![string("A"), Arg::List(vec![string("B"), string("C")])],
            BTreeMap::new(),
            None,
        );
        assert_eq!(args.strings(0, "names").unwrap(), ["A", "B", "C"]);
    }

    #[test]
    fn test_wrong_shape_is_invalid() {
        let mut args = Arguments::new("T", vec![Arg::Value(Value::from(1))], BTreeMap::new(), None);
        assert!(matches!(
            args.require_string(0, "path"),
            Err(SchemaError::InvalidArgument { expected: "a string", .. })
        ));
    }

    #[test]
    fn test_missing_required() {
        let mut args = Arguments::new("T", vec![], BTreeMap::new(), None);
        assert!(matches!(
            args.require_value(0, "config"),
            Err(SchemaError::MissingArgument { .. })
        ));
    }
}
