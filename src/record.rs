//! The record data model.
//!
//! The schema is known before any worker starts, so a record is a typed
//! variant per column held in a plain `Vec<FieldValue>` — an array-of-variants,
//! one slot per column in schema order. Each worker owns exactly one `Record`,
//! overwritten per line.

use crate::schema::{LogicalType, RowDescriptor};

/// A single column's parsed value. One variant per logical type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Bytes(Vec<u8>),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl FieldValue {
    /// The slot value a freshly-constructed record holds before any line has
    /// been parsed into it, and the value a `FieldParseError` leaves behind:
    /// a failed parse keeps the slot's *previous* value, so on the very first
    /// row that previous value is this default.
    fn default_for(logical_type: LogicalType) -> Self {
        match logical_type {
            LogicalType::Boolean => FieldValue::Boolean(false),
            LogicalType::Bytes => FieldValue::Bytes(Vec::new()),
            LogicalType::Int32 | LogicalType::Date => FieldValue::Int32(0),
            LogicalType::Int64
            | LogicalType::TimestampMillis
            | LogicalType::TimestampMicros
            | LogicalType::TimeMillis
            | LogicalType::TimeMicros => FieldValue::Int64(0),
            LogicalType::Float32 => FieldValue::Float32(0.0),
            LogicalType::Float64 => FieldValue::Float64(0.0),
            LogicalType::String => FieldValue::String(String::new()),
        }
    }
}

/// A tuple of typed values in row order.
#[derive(Debug, Clone)]
pub struct Record {
    pub fields: Vec<FieldValue>,
}

impl Record {
    /// Builds a reusable record, one slot per column, at its type's default.
    pub fn new(row: &RowDescriptor) -> Self {
        Self {
            fields: row
                .columns
                .iter()
                .map(|c| FieldValue::default_for(c.logical_type))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;

    #[test]
    fn new_record_has_one_slot_per_column() {
        let row = RowDescriptor {
            columns: vec![
                ColumnDescriptor {
                    name: "a".into(),
                    byte_width: 3,
                    logical_type: LogicalType::Int32,
                },
                ColumnDescriptor {
                    name: "b".into(),
                    byte_width: 5,
                    logical_type: LogicalType::String,
                },
            ],
        };
        let record = Record::new(&row);
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[0], FieldValue::Int32(0));
        assert_eq!(record.fields[1], FieldValue::String(String::new()));
    }
}
