mod avro_codec;
mod builders;
mod chunker;
mod cli;
mod error;
mod exporter;
mod orchestrator;
mod record;
mod registry;
mod schema;
mod splitter;
mod worker;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::ShredderError;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match orchestrator::run(&cli) {
        Ok(report) => {
            print_performance(&report);
        }
        Err(err) => {
            tracing::error!(%err, "run failed");
            std::process::exit(exit_code(&err));
        }
    }
}

fn print_performance(report: &orchestrator::RunReport) {
    println!("lines parsed:        {}", report.lines_parsed);
    println!("read chunk:          {:?}", report.duration_read_chunk);
    println!("to avro:             {:?}", report.duration_to_avro);
    println!("to export:           {:?}", report.duration_to_export);
    println!("done export:         {:?}", report.duration_done_export);
}

fn exit_code(err: &ShredderError) -> i32 {
    match err {
        ShredderError::Config(_) => 2,
        ShredderError::Schema(_) => 3,
        ShredderError::Export(_) => 4,
        ShredderError::Io(_) => 5,
    }
}
