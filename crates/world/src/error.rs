//! World-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("an eidolon named '{0}' already exists")]
    DuplicateEidolon(String),

    #[error("no eidolon named '{0}'")]
    UnknownEidolon(String),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode '{path}': {source}")]
    TomlDecode {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("character '{character}': attribute '{group}.{attribute}' is not in the schema")]
    UnknownAttribute {
        character: String,
        group: String,
        attribute: String,
    },

    #[error("character '{character}': attribute '{group}.{attribute}' has the wrong type (expected {expected})")]
    AttributeType {
        character: String,
        group: String,
        attribute: String,
        expected: &'static str,
    },

    #[error("character '{character}': range for '{group}.{attribute}' has min {min} > max {max}")]
    InvalidRange {
        character: String,
        group: String,
        attribute: String,
        min: f64,
        max: f64,
    },
}

pub type Result<T> = std::result::Result<T, WorldError>;
