//! Per-shard worker loop.
//!
//! Each worker owns one shard of the input buffer, one reusable [`Record`],
//! and one exporter instance. It scans lines on CR-LF boundaries within its
//! shard, skips a trailing footer line, splits each line into columns, drives
//! the column builders, and hands the assembled record to its exporter. A
//! failed column parse is non-fatal: the row is still exported with the
//! slot left at its previous value, and the line still counts toward
//! `lines_parsed`.
//!
//! A worker does *not* call `finish()` on its own exporter -- exporters are
//! finalized sequentially, in worker-index order, by the orchestrator only
//! after every worker has finished processing its shard (a global barrier).
//! `run_shard` therefore hands the still-open exporter back to its caller.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::builders::parse_into;
use crate::chunker::Shard;
use crate::exporter::Exporter;
use crate::record::Record;
use crate::schema::RowDescriptor;
use crate::splitter::split_columns;

/// The 12-byte marker that terminates a fixed-width file: a line *starting*
/// with 12 literal `*` characters (the footer line itself may carry trailing
/// text after the marker). A worker that encounters it stops scanning
/// immediately, even mid-shard, since no worker but the last one should ever
/// see it in practice.
pub const FOOTER_MARKER: &[u8] = b"************";

fn is_footer_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= FOOTER_MARKER.len() && &bytes[..FOOTER_MARKER.len()] == FOOTER_MARKER
}

/// Per-phase timings and counters a worker accumulates over its shard,
/// aggregated by the orchestrator into the run-wide performance summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerReport {
    pub lines_parsed: u64,
    pub duration_read_chunk: Duration,
    pub duration_to_avro: Duration,
    pub duration_to_export: Duration,
    pub duration_done_export: Duration,
}

/// Runs one worker's shard: `setup` the exporter, process every line, and
/// return the accumulated report together with the still-open exporter.
/// The caller is responsible for calling `finish()` -- see the module docs.
pub fn run_shard(
    worker_index: usize,
    shard: Shard,
    buffer: &[u8],
    row: &RowDescriptor,
    mut exporter: Box<dyn Exporter + Send>,
) -> Result<(WorkerReport, Box<dyn Exporter + Send>), crate::error::ExportError> {
    let read_start = Instant::now();
    let text = String::from_utf8_lossy(&buffer[shard.start..shard.end]);
    let duration_read_chunk = read_start.elapsed();

    exporter.setup()?;

    let mut report = WorkerReport {
        duration_read_chunk,
        ..WorkerReport::default()
    };
    let mut record = Record::new(row);

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        if is_footer_line(line) {
            break;
        }

        let to_avro_start = Instant::now();
        let columns = split_columns(line, row);
        if columns.len() < row.columns.len() {
            warn!(worker_index, line_len = line.len(), "short line, skipping");
            continue;
        }

        for (index, (column, substring)) in row.columns.iter().zip(columns.iter()).enumerate() {
            if let Err(err) = parse_into(column.logical_type, index, substring, &mut record.fields[index]) {
                warn!(worker_index, column_index = index, %err, "field parse failed, slot unchanged");
            }
        }
        report.duration_to_avro += to_avro_start.elapsed();

        let export_start = Instant::now();
        exporter.export_row(&record)?;
        report.duration_to_export += export_start.elapsed();

        report.lines_parsed += 1;
    }

    info!(worker_index, lines_parsed = report.lines_parsed, "worker finished shard");
    Ok((report, exporter))
}
