//! Line splitting into fixed-width columns.
//!
//! Splits a decoded line into one byte slice per column, each spanning exactly
//! `byte_width` **characters** (not bytes) of that column, in schema order.
//! Walks `char_indices` per column and slices once the character count matches
//! the column's declared width — necessary because the fixed-width format
//! declares widths in characters, and a byte-per-byte split would misalign any
//! record containing a multi-byte character ahead of the misaligned column.

use crate::schema::RowDescriptor;

/// Splits `line` into one byte-slice substring per column in `row`, counting
/// characters. Returns a substring per column, borrowing from `line` without
/// copying. Panics-free: a line shorter than the declared widths yields fewer
/// substrings than columns, which callers detect by checking `result.len()`.
pub fn split_columns<'a>(line: &'a str, row: &RowDescriptor) -> Vec<&'a str> {
    let mut substrings = Vec::with_capacity(row.columns.len());
    let mut first_byte = 0usize;

    for column in &row.columns {
        let mut char_count = 0usize;
        let mut end_byte = line.len();
        let mut complete = false;

        for (byte_offset, ch) in line[first_byte..].char_indices() {
            char_count += 1;
            if char_count == column.byte_width {
                end_byte = first_byte + byte_offset + ch.len_utf8();
                complete = true;
                break;
            }
        }

        if !complete {
            // Ran out of characters before reaching the declared width: the
            // line is short. Emit whatever remains and stop (caller detects
            // the shortfall via the returned Vec's length).
            substrings.push(&line[first_byte..end_byte]);
            break;
        }

        substrings.push(&line[first_byte..end_byte]);
        first_byte = end_byte;
    }

    substrings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, LogicalType};

    fn row_of_widths(widths: &[usize]) -> RowDescriptor {
        RowDescriptor {
            columns: widths
                .iter()
                .enumerate()
                .map(|(i, &w)| ColumnDescriptor {
                    name: format!("c{i}"),
                    byte_width: w,
                    logical_type: LogicalType::String,
                })
                .collect(),
        }
    }

    #[test]
    fn splits_ascii_columns_by_width() {
        let row = row_of_widths(&[3, 5]);
        let parts = split_columns("001hello", &row);
        assert_eq!(parts, vec!["001", "hello"]);
    }

    #[test]
    fn honors_multi_byte_characters() {
        // "a", "é" (2 bytes), "c" -- three characters, one of which is
        // multi-byte. A byte-per-byte split would misalign the third column.
        let row = row_of_widths(&[3]);
        let line = "aéc";
        let parts = split_columns(line, &row);
        assert_eq!(parts, vec!["aéc"]);
        assert_eq!(parts[0].chars().count(), 3);
    }

    #[test]
    fn single_character_columns() {
        let row = row_of_widths(&[1, 1, 1]);
        let parts = split_columns("xyz", &row);
        assert_eq!(parts, vec!["x", "y", "z"]);
    }
}
