use std::fs;

use dragon_config::config::{CastError, ConfigError, FailureKind, FunctionRegistry, Value};
use dragon_config::{Provider, SchemaError, SchemaLoader};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct Settings {
    database: Database,
    workers: i64,
    #[serde(default)]
    secret: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct Database {
    host: String,
    port: u16,
}

fn loader() -> SchemaLoader {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register("math", "double", |v: Value| match v {
        Value::Integer(n) => n
            .checked_mul(2)
            .map(Value::Integer)
            .ok_or_else(|| CastError::function("math.double", "overflow")),
        other => Err(CastError::function(
            "math.double",
            format!("expected an integer, got {}", other.type_name()),
        )),
    });
    SchemaLoader::with_functions(functions)
}

#[test]
fn layered_directory_env_and_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("00-base.toml"),
        "workers = 1\n[database]\nhost = \"localhost\"\nport = 5432\n",
    )
    .unwrap();
    fs::write(dir.path().join("10-override.yaml"), "database:\n  host: db.internal\n").unwrap();

    let schema = json!([
        {"type": "DirectorySource", "args": [dir.path().to_str().unwrap()]},
        {
            "type": "EnvironmentSource",
            "args": ["DRAGON_IT_WORKERS", "workers"],
            "cast_to": {
                "type": "import",
                "module": "math",
                "attribute": "double",
                "cast_before": {"type": "import", "module": "builtins", "attribute": "int"}
            },
            "optional": true
        }
    ]);

    let source = loader()
        .load_source_from_str(&schema.to_string())
        .unwrap();
    let provider = Provider::new(source);

    temp_env::with_var("DRAGON_IT_WORKERS", Some("4"), || {
        let settings: Settings = provider.extract().unwrap();
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.secret, None);
    });

    temp_env::with_var_unset("DRAGON_IT_WORKERS", || {
        let settings: Settings = provider.extract().unwrap();
        assert_eq!(settings.workers, 1);
    });

    // A value that fails the cast is absorbed by the optional wrapper too.
    temp_env::with_var("DRAGON_IT_WORKERS", Some("many"), || {
        let settings: Settings = provider.extract().unwrap();
        assert_eq!(settings.workers, 1);
    });
}

#[test]
fn alternative_reports_every_cause() {
    let provider = Provider::builder()
        .with_loader(loader())
        .with_schema(json!({
            "type": "AlternativeSource",
            "args": [
                {"type": "FileSource", "args": ["/nonexistent/dragon.json"]},
                {
                    "type": "EnvironmentSource",
                    "args": ["DRAGON_IT_PORT"],
                    "cast_to": {"type": "lambda", "operation": "int(x)"}
                }
            ]
        }))
        .build()
        .unwrap();

    temp_env::with_var("DRAGON_IT_PORT", Some("eighty"), || {
        let err = provider.provide().unwrap_err();
        assert_eq!(err.kind(), FailureKind::Aggregate);
        let ConfigError::AllSourcesFailed(causes) = err else {
            panic!("expected an aggregate failure");
        };
        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0].kind(), FailureKind::Source);
        assert!(matches!(causes[0], ConfigError::FileNotFound(_)));
        assert_eq!(causes[1].kind(), FailureKind::Cast);
    });
}

#[test]
fn binary_default_reaches_typed_config() {
    let provider = Provider::builder()
        .with_schema(json!({
            "type": "StaticSource",
            "args": [{"workers": 2, "database": {"host": "h", "port": 1}}]
        }))
        .with_schema(json!({
            "type": "BuildObjectFrom",
            "args": [
                "secret",
                {
                    "type": "OptionalSource",
                    "args": [{"type": "FileSource", "args": ["/nonexistent/secret.json"]}],
                    "default": {"type": "binary", "value": "abc"}
                }
            ]
        }))
        .build()
        .unwrap();

    let settings: Settings = provider.extract().unwrap();
    assert_eq!(settings.secret, Some(b"abc".to_vec()));
}

#[test]
fn schema_problems_never_reach_resolution() {
    let cases = [
        json!({"type": "NoSuchSource"}),
        json!({"type": "EnvironmentSource"}),
        json!({
            "type": "EnvironmentSource",
            "args": ["X"],
            "cast_to": {"type": "lambda", "operation": "exec(x)"}
        }),
        json!({
            "type": "EnvironmentSource",
            "args": ["X"],
            "cast_to": {"type": "import", "module": "subprocess", "attribute": "run"}
        }),
        json!({
            "type": "MergingSource",
            "args": [{"type": "StaticSource", "args": [{}]}, "not a source"]
        }),
    ];
    for schema in cases {
        let result = loader().load_source_from_dict(&schema);
        assert!(result.is_err(), "expected schema error for {schema}");
    }

    assert!(matches!(
        loader().load_source_from_dict(&json!({"type": "NoSuchSource"})),
        Err(SchemaError::UnknownType(_))
    ));
}
