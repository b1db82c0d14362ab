pub mod config;
mod error;
pub mod provider;

pub use config::{
    load_source_from_dict, load_source_from_list, ConfigError, SchemaError, SchemaLoader, Source,
    Value,
};
pub use error::Error;
pub use provider::Provider;
