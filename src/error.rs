//! Error taxonomy for the shredding engine.
//!
//! Each variant family maps onto one of the five error classes the orchestrator
//! distinguishes: configuration, schema, per-field parsing, export, and I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal before any worker starts: bad CLI arguments, unknown logical type,
/// unreadable schema or data file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing or invalid argument: {0}")]
    InvalidArgument(String),

    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    #[error("schema id must be non-negative, got {0}")]
    InvalidSchemaId(i64),

    #[error("unknown logical type {logical_type:?} for column {column_index}")]
    UnknownLogicalType {
        column_index: usize,
        logical_type: String,
    },

    #[error("could not read schema file {path:?}")]
    SchemaFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open data file {path:?}")]
    DataFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Schema document malformed or structurally wrong.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema document is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),

    #[error("schema document has no top-level \"fields\" array")]
    MissingFields,

    #[error("field {index} is missing a \"name\"")]
    MissingFieldName { index: usize },

    #[error("field {name:?} is missing a \"type\" object")]
    MissingFieldType { name: String },

    #[error("field {name:?} type is missing numeric \"len\"")]
    MissingLen { name: String },

    #[error("field {name:?} type has neither \"type\" nor \"logicalType\"")]
    MissingTypeTag { name: String },

    #[error("field {name:?} declares byte_width {byte_width}, below the {min_byte_width}-byte minimum its logical type requires")]
    ColumnTooNarrow {
        name: String,
        byte_width: usize,
        min_byte_width: usize,
    },

    #[error("could not parse row schema as an Avro schema")]
    AvroSchema(#[from] apache_avro::Error),
}

/// A single column value could not be parsed. Non-fatal: the row is still
/// exported with the slot left at its previous value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("column {column_index} ({logical_type}): {reason}")]
pub struct FieldParseError {
    pub column_index: usize,
    pub logical_type: &'static str,
    pub reason: String,
}

impl FieldParseError {
    pub fn new(column_index: usize, logical_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            column_index,
            logical_type,
            reason: reason.into(),
        }
    }
}

/// The sink rejected a write: I/O error, broker delivery failure, or encoder
/// failure. Fatal for the whole run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to open output file {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("avro container encoder error")]
    Avro(#[from] apache_avro::Error),

    #[error("avro container flush/write error")]
    Io(#[from] std::io::Error),

    #[error("kafka delivery failed: {0}")]
    KafkaDelivery(String),

    #[error("schema registry error: {0}")]
    Registry(String),
}

/// File read failure during chunk load. Fatal.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("failed to read input file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error returned from `main`'s fallible path.
#[derive(Error, Debug)]
pub enum ShredderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Io(#[from] IoError),
}
