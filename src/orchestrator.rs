//! Orchestrator: wires schema, file, shards, exporters, and workers together
//! and runs them to completion.
//!
//! Bulk-synchronous: one OS thread per worker, a single barrier (the
//! `thread::scope` join) before finalization. No worker communicates with
//! another; all cross-worker state is either immutable and shared (the
//! schema, the Avro schema, the registry client) or owned per-worker (the
//! exporter, the reusable record). Exporters are finalized only after that
//! barrier, sequentially in worker-index order, so no two `finish()` calls
//! ever run concurrently with each other or with another worker's row
//! processing.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::chunker::compute_shards;
use crate::cli::Cli;
use crate::error::{ConfigError, ShredderError};
use crate::exporter::{select_sink, BrokerExporter, ContainerFileExporter, Exporter, ExporterConfig, SinkTarget};
use crate::registry::RegistryClient;
use crate::schema::load_schema;
use crate::worker::{run_shard, WorkerReport};

/// Aggregated counters and per-phase timings across every worker, surfaced
/// at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
    pub lines_parsed: u64,
    pub duration_read_chunk: Duration,
    pub duration_to_avro: Duration,
    pub duration_to_export: Duration,
    pub duration_done_export: Duration,
}

impl RunReport {
    fn accumulate(&mut self, worker: WorkerReport) {
        self.lines_parsed += worker.lines_parsed;
        self.duration_read_chunk += worker.duration_read_chunk;
        self.duration_to_avro += worker.duration_to_avro;
        self.duration_to_export += worker.duration_to_export;
        self.duration_done_export += worker.duration_done_export;
    }
}

pub fn run(cli: &Cli) -> Result<RunReport, ShredderError> {
    cli.validate().map_err(ShredderError::Config)?;

    let loaded = load_schema(&cli.schema_path)?;
    let row = Arc::new(loaded.row);
    let avro_schema = Arc::new(loaded.avro_schema);
    let avro_schema_json = Arc::new(loaded.avro_schema_json);

    let buffer = fs::read(&cli.data_path).map_err(|source| ConfigError::DataFileUnreadable {
        path: cli.data_path.clone(),
        source,
    })?;

    let shards = compute_shards(buffer.len(), cli.workers, row.row_byte_length(), &buffer);
    let sink = select_sink(&cli.sink_url);

    let exporter_config = Arc::new(ExporterConfig {
        row: row.clone(),
        avro_schema: avro_schema.clone(),
        avro_schema_json: avro_schema_json.clone(),
    });

    // For the broker path, resolve connection details and build one shared
    // registry client up front; every worker's exporter registers the same
    // subject against it, so the client's cache turns worker 2..N's
    // registrations into cache hits.
    let broker_setup = match &sink {
        SinkTarget::Broker { broker_addr } => {
            let broker_env = cli.broker_env(broker_addr).map_err(ShredderError::Config)?;
            let registry = Arc::new(RegistryClient::new(broker_env.registry_url.clone()));
            Some((broker_env, registry))
        }
        SinkTarget::ContainerFile { .. } => None,
    };

    info!(workers = cli.workers, file_len = buffer.len(), "starting run");

    let schema_id = cli.resolved_schema_id();

    let worker_results = std::thread::scope(|scope| -> Result<Vec<(WorkerReport, Box<dyn Exporter + Send>)>, ShredderError> {
        let mut handles = Vec::with_capacity(cli.workers);

        for (worker_index, shard) in shards.into_iter().enumerate() {
            let row = row.clone();
            let buffer = &buffer;
            let exporter_config = exporter_config.clone();
            let sink = &sink;
            let broker_setup = broker_setup.clone();
            let topic = cli.topic.clone();

            let handle = scope.spawn(move || -> Result<(WorkerReport, Box<dyn Exporter + Send>), ShredderError> {
                let exporter: Box<dyn Exporter + Send> = match sink {
                    SinkTarget::ContainerFile { base_path } => {
                        Box::new(ContainerFileExporter::new(base_path, worker_index, exporter_config))
                    }
                    SinkTarget::Broker { .. } => {
                        let (broker_env, registry_client) =
                            broker_setup.expect("broker sink always builds a registry client");
                        Box::new(BrokerExporter::new(
                            topic,
                            worker_index as i32,
                            broker_env.bootstrap_servers,
                            broker_env.tls,
                            exporter_config,
                            registry_client,
                            schema_id,
                        ))
                    }
                };

                run_shard(worker_index, shard, buffer, &row, exporter).map_err(ShredderError::from)
            });

            handles.push(handle);
        }

        // Joining every handle here is the barrier: no `finish()` has run
        // yet, only `setup()`/`export_row()`.
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.join().expect("worker thread panicked")?);
        }
        Ok(results)
    })?;

    // Finalize sequentially, in worker-index order, only after every worker
    // has finished processing its shard.
    let mut report = RunReport::default();
    for (mut worker_report, mut exporter) in worker_results {
        let done_start = Instant::now();
        exporter.finish()?;
        worker_report.duration_done_export = done_start.elapsed();
        report.accumulate(worker_report);
    }

    info!(
        lines_parsed = report.lines_parsed,
        read_ms = report.duration_read_chunk.as_millis(),
        to_avro_ms = report.duration_to_avro.as_millis(),
        to_export_ms = report.duration_to_export.as_millis(),
        done_export_ms = report.duration_done_export.as_millis(),
        "run complete"
    );

    Ok(report)
}
