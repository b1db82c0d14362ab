//! Transforms applied to values after a source resolves them.

mod expr;
mod registry;

pub use expr::Expr;
pub use registry::{Function, FunctionRegistry};

use std::fmt;

use super::encoding::Encoding;
use super::error::{CastError, SchemaError};
use super::value::Value;

/// A value transform built from a `lambda`, `binary` or `import` schema node.
#[derive(Clone)]
pub enum Cast {
    /// Evaluates an expression with `x` bound to the input.
    Lambda(Expr),
    /// Encodes `value` if set, otherwise the input string.
    Binary {
        value: Option<String>,
        encoding: Encoding,
    },
    /// Calls an allow-listed function, after an optional pre-cast.
    Import {
        module: String,
        attribute: String,
        function: Function,
        cast_before: Option<Box<Cast>>,
    },
}

impl Cast {
    pub fn lambda(operation: &str) -> Result<Self, SchemaError> {
        Expr::parse(operation)
            .map(Cast::Lambda)
            .map_err(|message| SchemaError::Expression {
                expression: operation.to_string(),
                message,
            })
    }

    pub fn binary(value: Option<String>, encoding: Encoding) -> Self {
        Cast::Binary { value, encoding }
    }

    /// Looks `module.attribute` up in the allow-list.
    pub fn import(
        functions: &FunctionRegistry,
        module: &str,
        attribute: &str,
        cast_before: Option<Cast>,
    ) -> Result<Self, CastError> {
        let function = functions.get(module, attribute)?;
        Ok(Cast::Import {
            module: module.to_string(),
            attribute: attribute.to_string(),
            function,
            cast_before: cast_before.map(Box::new),
        })
    }

    pub fn apply(&self, value: Value) -> Result<Value, CastError> {
        match self {
            Cast::Lambda(expr) => expr.evaluate(&value).map_err(|message| CastError::Eval {
                expression: expr.source().to_string(),
                message,
            }),
            Cast::Binary {
                value: Some(literal),
                encoding,
            } => encoding.encode(literal).map(Value::Bytes),
            Cast::Binary {
                value: None,
                encoding,
            } => match value {
                Value::String(s) => encoding.encode(&s).map(Value::Bytes),
                Value::Bytes(b) => Ok(Value::Bytes(b)),
                other => Err(CastError::Encoding {
                    encoding: encoding.to_string(),
                    message: format!("expected a string, got {}", other.type_name()),
                }),
            },
            Cast::Import {
                function,
                cast_before,
                ..
            } => {
                let value = match cast_before {
                    Some(before) => before.apply(value)?,
                    None => value,
                };
                function(value)
            }
        }
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cast::Lambda(expr) => f.debug_tuple("Lambda").field(&expr.source()).finish(),
            Cast::Binary { value, encoding } => f
                .debug_struct("Binary")
                .field("value", value)
                .field("encoding", encoding)
                .finish(),
            Cast::Import {
                module,
                attribute,
                cast_before,
                ..
            } => f
                .debug_struct("Import")
                .field("module", module)
                .field("attribute", attribute)
                .field("cast_before", cast_before)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double() -> FunctionRegistry {
        let mut functions = FunctionRegistry::with_builtins();
        functions.register("math", "double", |v: Value| match v {
            Value::Integer(n) => Ok(Value::Integer(n * 2)),
            other => Err(CastError::function("math.double", format!("not an integer: {other}"))),
        });
        functions
    }

    #[test]
    fn test_import_with_cast_before() {
        let functions = double();
        let before = Cast::import(&functions, "builtins", "int", None).unwrap();
        let cast = Cast::import(&functions, "math", "double", Some(before)).unwrap();
        assert_eq!(cast.apply(Value::from("4")).unwrap(), Value::from(8));
    }

    #[test]
    fn test_import_without_cast_before_passes_raw_value() {
        let cast = Cast::import(&double(), "math", "double", None).unwrap();
        assert!(matches!(
            cast.apply(Value::from("4")),
            Err(CastError::Function { .. })
        ));
    }

    #[test]
    fn test_cast_before_failure_stops_pipeline() {
        let functions = double();
        let before = Cast::lambda("int(x)").unwrap();
        let cast = Cast::import(&functions, "math", "double", Some(before)).unwrap();
        assert!(matches!(
            cast.apply(Value::from("four")),
            Err(CastError::Eval { .. })
        ));
    }

    #[test]
    fn test_import_unknown_function() {
        let err = Cast::import(&FunctionRegistry::new(), "os", "system", None).unwrap_err();
        assert_eq!(
            err,
            CastError::UnknownFunction {
                module: "os".into(),
                attribute: "system".into()
            }
        );
    }

    #[test]
    fn test_binary_literal_and_input() {
        let literal = Cast::binary(Some("key".into()), Encoding::Ascii);
        assert_eq!(literal.apply(Value::Null).unwrap(), Value::Bytes(b"key".to_vec()));

        let input = Cast::binary(None, Encoding::Utf8);
        assert_eq!(
            input.apply(Value::from("é")).unwrap(),
            Value::Bytes(vec![0xc3, 0xa9])
        );
        assert!(Cast::binary(None, Encoding::Ascii).apply(Value::from("é")).is_err());
    }

    #[test]
    fn test_lambda_syntax_error_is_schema_error() {
        assert!(matches!(
            Cast::lambda("x +"),
            Err(SchemaError::Expression { .. })
        ));
    }
}
