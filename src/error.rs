//! Error types for schema and record construction

use thiserror::Error;

use crate::schema::SchemaKind;

/// Result type for schema and record operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema, record and codec errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{operation} is only valid for {expected} schemas, builder is {actual}")]
    InvalidBuilderState {
        operation: &'static str,
        expected: SchemaKind,
        actual: String,
    },

    #[error("Schema type not set")]
    MissingType,

    #[error("Entry name not set")]
    MissingEntryName,

    #[error("No element schema set for this ARRAY schema")]
    MissingElementSchema,

    #[error("{0} not in schema")]
    NotInSchema(String),

    #[error("Entry {0} is not nullable")]
    NullNotAllowed(String),

    #[error("Type mismatch on {name}: entry is {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: SchemaKind,
        actual: SchemaKind,
    },

    #[error("Missing value for non-nullable entry {0}")]
    MissingValue(String),

    #[error("Record schema does not match: {0}")]
    SchemaMismatch(String),

    #[error("Invalid canonical schema: {0}")]
    InvalidFormat(String),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
