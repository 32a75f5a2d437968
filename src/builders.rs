//! Column builders: one parse function per logical type.
//!
//! Dispatched through a closed enum rather than trait objects -- the
//! capability set is small and fixed, so tagged variants with a dispatched
//! `parse` function beat a trait per type. A builder never allocates a
//! per-row container beyond what writing into the record's existing slot
//! requires.
//!
//! On failure a builder returns `Err(FieldParseError)` and the caller leaves
//! the record's slot untouched -- `parse` therefore takes `&mut FieldValue`
//! and only overwrites it on success.

use crate::error::FieldParseError;
use crate::record::FieldValue;
use crate::schema::LogicalType;

/// Dispatches `substring` to the parse routine for `logical_type`, writing the
/// result into `slot` on success and leaving `slot` untouched on failure.
pub fn parse_into(
    logical_type: LogicalType,
    column_index: usize,
    substring: &str,
    slot: &mut FieldValue,
) -> Result<(), FieldParseError> {
    match logical_type {
        LogicalType::Boolean => parse_boolean(column_index, substring, slot),
        LogicalType::Bytes => parse_bytes(column_index, substring, slot),
        LogicalType::Int32 => parse_int32(column_index, substring, slot),
        LogicalType::Int64 => parse_int64(column_index, substring, slot),
        LogicalType::Float32 => parse_float32(column_index, substring, slot),
        LogicalType::Float64 => parse_float64(column_index, substring, slot),
        LogicalType::String => parse_string(column_index, substring, slot),
        LogicalType::Date => parse_date(column_index, substring, slot),
        LogicalType::TimestampMillis => parse_timestamp(column_index, substring, slot, "timestamp_ms"),
        LogicalType::TimestampMicros => parse_timestamp(column_index, substring, slot, "timestamp_us"),
        LogicalType::TimeMillis => parse_timestamp(column_index, substring, slot, "time_ms"),
        LogicalType::TimeMicros => parse_timestamp(column_index, substring, slot, "time_us"),
    }
}

/// `J|j|Y|y` -> true, `N|n` -> false, anything else is a `FieldParseError`
/// rather than a silent no-op, since an unwritten boolean slot would
/// otherwise be indistinguishable from a row that never set it.
fn parse_boolean(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    match substring.chars().next() {
        Some('J') | Some('j') | Some('Y') | Some('y') => {
            *slot = FieldValue::Boolean(true);
            Ok(())
        }
        Some('N') | Some('n') => {
            *slot = FieldValue::Boolean(false);
            Ok(())
        }
        Some(other) => Err(FieldParseError::new(
            column_index,
            "boolean",
            format!("unrecognized boolean character {other:?}"),
        )),
        None => Err(FieldParseError::new(column_index, "boolean", "empty column")),
    }
}

fn parse_bytes(_column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    *slot = FieldValue::Bytes(substring.as_bytes().to_vec());
    Ok(())
}

fn parse_int32(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    match substring.trim().parse::<i32>() {
        Ok(v) => {
            *slot = FieldValue::Int32(v);
            Ok(())
        }
        Err(e) => Err(FieldParseError::new(column_index, "int32", e.to_string())),
    }
}

fn parse_int64(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    match substring.trim().parse::<i64>() {
        Ok(v) => {
            *slot = FieldValue::Int64(v);
            Ok(())
        }
        Err(e) => Err(FieldParseError::new(column_index, "int64", e.to_string())),
    }
}

fn parse_float32(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    match substring.trim().parse::<f32>() {
        Ok(v) => {
            *slot = FieldValue::Float32(v);
            Ok(())
        }
        Err(e) => Err(FieldParseError::new(column_index, "float32", e.to_string())),
    }
}

fn parse_float64(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    match substring.trim().parse::<f64>() {
        Ok(v) => {
            *slot = FieldValue::Float64(v);
            Ok(())
        }
        Err(e) => Err(FieldParseError::new(column_index, "float64", e.to_string())),
    }
}

fn parse_string(_column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    // No trimming: the substring is the value.
    *slot = FieldValue::String(substring.to_string());
    Ok(())
}

/// `date` is parsed via the timestamp grammar and quantized to days, stored as
/// an int32 day count. Follows the same epoch-second-then-truncate path the
/// other timestamp builders use.
fn parse_date(column_index: usize, substring: &str, slot: &mut FieldValue) -> Result<(), FieldParseError> {
    let epoch_seconds = parse_timestamp_grammar(column_index, substring, "date")?;
    *slot = FieldValue::Int32((epoch_seconds / 86_400) as i32);
    Ok(())
}

/// Timestamp grammar: `YYYY-MM-DD-hh.mm.ss.ffffff`. All four builders --
/// millisecond, microsecond, date, and time-of-day -- return POSIX
/// epoch-seconds, truncating to whole seconds regardless of which sub-second
/// unit the logical type names. This matches the observed behaviour of the
/// legacy fixed-width exporter this crate is compatible with and is preserved
/// deliberately rather than silently corrected -- see DESIGN.md.
fn parse_timestamp(
    column_index: usize,
    substring: &str,
    slot: &mut FieldValue,
    logical_type: &'static str,
) -> Result<(), FieldParseError> {
    let epoch_seconds = parse_timestamp_grammar(column_index, substring, logical_type)?;
    *slot = FieldValue::Int64(epoch_seconds);
    Ok(())
}

/// Reads the date/time fields by slicing fixed byte offsets: separators sit
/// at positions 4, 7, 10, 13, 16, 19; the fractional segment (3, 6, or 9
/// digits) starts at byte 20 and is discarded, truncating every timestamp
/// to whole seconds regardless of its declared sub-second precision.
fn parse_timestamp_grammar(
    column_index: usize,
    substring: &str,
    logical_type: &'static str,
) -> Result<i64, FieldParseError> {
    let bytes = substring.as_bytes();
    let err = |reason: &str| FieldParseError::new(column_index, logical_type, reason.to_string());

    if bytes.len() < 20 {
        return Err(err("timestamp field shorter than the fixed grammar requires"));
    }

    let field = |lo: usize, hi: usize| -> Result<i64, FieldParseError> {
        std::str::from_utf8(&bytes[lo..hi])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| err("non-decimal date/time field"))
    };

    let year = field(0, 4)?;
    let month = field(5, 7)?;
    let day = field(8, 10)?;
    let hour = field(11, 13)?;
    let minute = field(14, 16)?;
    let second = field(17, 19)?;

    let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| err("invalid calendar date"))?;
    let time = chrono::NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)
        .ok_or_else(|| err("invalid time of day"))?;
    let naive = chrono::NaiveDateTime::new(date, time);

    Ok(naive.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> FieldValue {
        FieldValue::Int32(0)
    }

    #[test]
    fn boolean_accepts_yes_variants() {
        let mut s = FieldValue::Boolean(false);
        parse_into(LogicalType::Boolean, 0, "Y", &mut s).unwrap();
        assert_eq!(s, FieldValue::Boolean(true));
        parse_into(LogicalType::Boolean, 0, "j", &mut s).unwrap();
        assert_eq!(s, FieldValue::Boolean(true));
    }

    #[test]
    fn boolean_accepts_no_variants() {
        let mut s = FieldValue::Boolean(true);
        parse_into(LogicalType::Boolean, 0, "n", &mut s).unwrap();
        assert_eq!(s, FieldValue::Boolean(false));
    }

    #[test]
    fn boolean_rejects_other_characters() {
        let mut s = FieldValue::Boolean(true);
        let err = parse_into(LogicalType::Boolean, 0, "x", &mut s).unwrap_err();
        assert_eq!(err.column_index, 0);
        // slot is left untouched on failure
        assert_eq!(s, FieldValue::Boolean(true));
    }

    #[test]
    fn int32_parses_signed_decimal() {
        let mut s = slot();
        parse_into(LogicalType::Int32, 0, "001", &mut s).unwrap();
        assert_eq!(s, FieldValue::Int32(1));
    }

    #[test]
    fn int32_leaves_slot_on_failure() {
        let mut s = FieldValue::Int32(42);
        let err = parse_into(LogicalType::Int32, 0, "abc", &mut s).unwrap_err();
        assert_eq!(err.logical_type, "int32");
        assert_eq!(s, FieldValue::Int32(42));
    }

    #[test]
    fn string_is_not_trimmed() {
        let mut s = FieldValue::String(String::new());
        parse_into(LogicalType::String, 0, "hello", &mut s).unwrap();
        assert_eq!(s, FieldValue::String("hello".into()));
    }

    #[test]
    fn timestamp_millis_returns_epoch_seconds_not_millis() {
        // 2020-07-09-09.59.59.993750 -> epoch seconds for that instant,
        // dropping the fractional part entirely.
        let mut s = FieldValue::Int64(0);
        parse_into(
            LogicalType::TimestampMillis,
            0,
            "2020-07-09-09.59.59.993750",
            &mut s,
        )
        .unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2020, 7, 9)
            .unwrap()
            .and_hms_opt(9, 59, 59)
            .unwrap()
            .and_utc()
            .timestamp();
        assert_eq!(s, FieldValue::Int64(expected));
    }

    #[test]
    fn timestamp_rejects_short_field() {
        let mut s = FieldValue::Int64(0);
        let err = parse_into(LogicalType::TimestampMicros, 0, "2020-07-09", &mut s).unwrap_err();
        assert_eq!(err.logical_type, "timestamp_us");
    }
}
