//! Schema loading.
//!
//! Parses the user-supplied schema document into a [`RowDescriptor`] (the ordered
//! column geometry every worker shares immutably) and the matching Avro schema
//! handle. Every worker is built from the same `RowDescriptor` and `apache_avro::Schema`
//! so that column positions and Avro field order never drift across threads.

use std::fs;
use std::path::Path;

use serde_json::Value as Json;

use crate::error::{ConfigError, SchemaError};

/// One column's logical type. `Bytes` accepts a capitalized spelling as well
/// as the lowercase Avro-style one, for compatibility with schema documents
/// generated by older tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Boolean,
    Bytes,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
}

impl LogicalType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "boolean" => Some(Self::Boolean),
            "bytes" | "Bytes" => Some(Self::Bytes),
            "int" | "int32" => Some(Self::Int32),
            "long" | "int64" => Some(Self::Int64),
            "float" | "float32" => Some(Self::Float32),
            "double" | "float64" => Some(Self::Float64),
            "string" => Some(Self::String),
            "date" => Some(Self::Date),
            "time-millis" | "time_ms" => Some(Self::TimeMillis),
            "time-micros" | "time_us" => Some(Self::TimeMicros),
            "timestamp-millis" | "timestamp_ms" => Some(Self::TimestampMillis),
            "timestamp-micros" | "timestamp_us" => Some(Self::TimestampMicros),
            _ => None,
        }
    }

    /// Minimum byte width the parse functions require for this type.
    pub fn min_byte_width(self) -> usize {
        match self {
            Self::Boolean => 1,
            Self::Bytes | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
            | Self::String => 1,
            Self::Date => 10,
            Self::TimeMillis | Self::TimestampMillis => 23,
            Self::TimeMicros | Self::TimestampMicros => 26,
        }
    }
}

/// A column's name, declared byte width, and logical type.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub byte_width: usize,
    pub logical_type: LogicalType,
}

/// Ordered column geometry plus the derived row byte length.
#[derive(Debug, Clone)]
pub struct RowDescriptor {
    pub columns: Vec<ColumnDescriptor>,
}

impl RowDescriptor {
    /// `Σ byte_width + 2`, the trailing `+2` accounting for the CR-LF terminator.
    pub fn row_byte_length(&self) -> usize {
        self.columns.iter().map(|c| c.byte_width).sum::<usize>() + 2
    }
}

/// The loaded schema: row geometry plus the Avro schema used to encode each record.
pub struct LoadedSchema {
    pub row: RowDescriptor,
    pub avro_schema: apache_avro::Schema,
    pub avro_schema_json: String,
}

/// Reads the schema document at `path`, parses its `fields` array into a
/// [`RowDescriptor`], and parses the whole document as an Avro record schema.
pub fn load_schema(path: &Path) -> Result<LoadedSchema, crate::error::ShredderError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::SchemaFileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let row = parse_row_descriptor(&text)?;
    let avro_schema = apache_avro::Schema::parse_str(&text).map_err(SchemaError::from)?;

    Ok(LoadedSchema {
        row,
        avro_schema,
        avro_schema_json: text,
    })
}

/// Parses the `fields` array of a schema document into a [`RowDescriptor`].
///
/// Each field must be an object with `name: string` and `type: { len: number,
/// type|logicalType: string }`. `logicalType` overrides `type` when both are
/// present.
pub fn parse_row_descriptor(schema_json: &str) -> Result<RowDescriptor, SchemaError> {
    let doc: Json = serde_json::from_str(schema_json)?;

    let fields = doc
        .get("fields")
        .and_then(Json::as_array)
        .ok_or(SchemaError::MissingFields)?;

    let mut columns = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let name = field
            .get("name")
            .and_then(Json::as_str)
            .ok_or(SchemaError::MissingFieldName { index })?
            .to_string();

        let type_obj = field
            .get("type")
            .and_then(Json::as_object)
            .ok_or_else(|| SchemaError::MissingFieldType { name: name.clone() })?;

        let len = type_obj
            .get("len")
            .and_then(Json::as_f64)
            .ok_or_else(|| SchemaError::MissingLen { name: name.clone() })?;

        let type_tag = type_obj
            .get("logicalType")
            .and_then(Json::as_str)
            .or_else(|| type_obj.get("type").and_then(Json::as_str))
            .ok_or_else(|| SchemaError::MissingTypeTag { name: name.clone() })?;

        let logical_type = LogicalType::from_str(type_tag).ok_or_else(|| {
            // Folded into ConfigError at the call site in main.rs; here we only
            // have the schema-parsing context, so report it via SchemaError.
            SchemaError::MissingTypeTag {
                name: format!("{name} (unknown logical type {type_tag:?})"),
            }
        })?;

        let byte_width = len as usize;
        let min_byte_width = logical_type.min_byte_width();
        if byte_width < min_byte_width {
            return Err(SchemaError::ColumnTooNarrow {
                name,
                byte_width,
                min_byte_width,
            });
        }

        columns.push(ColumnDescriptor {
            name,
            byte_width,
            logical_type,
        });
    }

    Ok(RowDescriptor { columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_COLUMN_SCHEMA: &str = r#"{
        "type": "record",
        "name": "test",
        "fields": [
            {"name": "a", "type": {"len": 3, "type": "int"}},
            {"name": "b", "type": {"len": 5, "type": "string"}}
        ]
    }"#;

    #[test]
    fn parses_two_column_schema() {
        let row = parse_row_descriptor(TWO_COLUMN_SCHEMA).unwrap();
        assert_eq!(row.columns.len(), 2);
        assert_eq!(row.columns[0].byte_width, 3);
        assert!(matches!(row.columns[0].logical_type, LogicalType::Int32));
        assert_eq!(row.columns[1].byte_width, 5);
        assert!(matches!(row.columns[1].logical_type, LogicalType::String));
        assert_eq!(row.row_byte_length(), 3 + 5 + 2);
    }

    #[test]
    fn logical_type_overrides_primitive_type() {
        let schema = r#"{"fields":[{"name":"t","type":{"len":23,"type":"long","logicalType":"timestamp-millis"}}]}"#;
        let row = parse_row_descriptor(schema).unwrap();
        assert!(matches!(
            row.columns[0].logical_type,
            LogicalType::TimestampMillis
        ));
    }

    #[test]
    fn bytes_spelling_is_case_insensitive() {
        let schema = r#"{"fields":[{"name":"b","type":{"len":4,"type":"Bytes"}}]}"#;
        let row = parse_row_descriptor(schema).unwrap();
        assert!(matches!(row.columns[0].logical_type, LogicalType::Bytes));
    }

    #[test]
    fn missing_fields_array_is_an_error() {
        let err = parse_row_descriptor("{}").unwrap_err();
        assert!(matches!(err, SchemaError::MissingFields));
    }

    #[test]
    fn unknown_logical_type_is_an_error() {
        let schema = r#"{"fields":[{"name":"x","type":{"len":1,"type":"imaginary"}}]}"#;
        assert!(parse_row_descriptor(schema).is_err());
    }

    #[test]
    fn under_width_timestamp_column_is_an_error() {
        let schema = r#"{"fields":[{"name":"t","type":{"len":5,"type":"long","logicalType":"timestamp-millis"}}]}"#;
        let err = parse_row_descriptor(schema).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ColumnTooNarrow {
                byte_width: 5,
                min_byte_width: 23,
                ..
            }
        ));
    }
}
