//! Command-line interface.
//!
//! Seven positional arguments mirror the legacy fixed-width exporter's
//! invocation order exactly, so existing run scripts keep working unchanged:
//! sink URL, registry address, schema path, schema id, topic, worker count,
//! data path. Kafka connection details are read from the environment, with
//! any CLI-provided value always taking precedence.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::exporter::TlsMaterial;

/// Shreds a fixed-width text file into Avro records, writing them either to
/// local container files or to a Kafka topic via a schema registry.
#[derive(Parser, Debug)]
#[command(name = "shredder", version, about)]
pub struct Cli {
    /// Destination: a filesystem path prefix, or an `http(s)://host:port`
    /// broker address to produce to instead.
    pub sink_url: String,

    /// Schema registry address, `host:port`. Ignored for the container-file sink.
    pub registry_addr: String,

    /// Path to the row schema document (JSON).
    pub schema_path: PathBuf,

    /// Pre-registered schema id to use instead of registering a new one.
    /// A negative value means "register at startup".
    pub schema_id: i64,

    /// Kafka topic to produce to. Ignored for the container-file sink.
    pub topic: String,

    /// Number of parallel workers (and shards) to use.
    pub workers: usize,

    /// Path to the fixed-width data file to shred.
    pub data_path: PathBuf,
}

/// Kafka broker connection details resolved from the environment, with the
/// CLI's `registry_addr` always overriding `KAFKA_SCHEMA_REGISTRY`.
#[derive(Debug, Clone)]
pub struct BrokerEnv {
    pub bootstrap_servers: String,
    pub registry_url: String,
    pub tls: Option<TlsMaterial>,
}

impl Cli {
    /// `None` when the sentinel `-1` ("register at startup") was given,
    /// otherwise the pre-registered id to use in place of a registry call.
    pub fn resolved_schema_id(&self) -> Option<u32> {
        if self.schema_id < 0 {
            None
        } else {
            Some(self.schema_id as u32)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers));
        }
        if self.schema_id < -1 {
            return Err(ConfigError::InvalidSchemaId(self.schema_id));
        }
        Ok(())
    }

    /// Resolves broker connection details. When `sink_broker_addr` is
    /// non-empty (the CLI's sink URL named a broker address directly) it
    /// always wins over `KAFKA_BROKER`. `registry_addr` on the CLI always
    /// wins over `KAFKA_SCHEMA_REGISTRY`. TLS material is only assembled
    /// when all three `KAFKA_*_FILE` variables are present.
    pub fn broker_env(&self, sink_broker_addr: &str) -> Result<BrokerEnv, ConfigError> {
        let bootstrap_servers = if !sink_broker_addr.is_empty() {
            sink_broker_addr.to_string()
        } else {
            std::env::var("KAFKA_BROKER")
                .map_err(|_| ConfigError::InvalidArgument("KAFKA_BROKER is not set".to_string()))?
        };

        let registry_url = if self.registry_addr.is_empty() {
            std::env::var("KAFKA_SCHEMA_REGISTRY")
                .map_err(|_| ConfigError::InvalidArgument("registry address not given on the CLI or in KAFKA_SCHEMA_REGISTRY".to_string()))?
        } else {
            self.registry_addr.clone()
        };

        let tls = match (
            std::env::var("KAFKA_CA_FILE"),
            std::env::var("KAFKA_KEY_FILE"),
            std::env::var("KAFKA_CERTIFICATE_FILE"),
        ) {
            (Ok(ca_file), Ok(key_file), Ok(certificate_file)) => Some(TlsMaterial {
                ca_file,
                key_file,
                certificate_file,
            }),
            _ => None,
        };

        Ok(BrokerEnv {
            bootstrap_servers,
            registry_url,
            tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            sink_url: "/tmp/out".to_string(),
            registry_addr: String::new(),
            schema_path: PathBuf::from("schema.json"),
            schema_id: -1,
            topic: "events".to_string(),
            workers: 4,
            data_path: PathBuf::from("data.txt"),
        }
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cli = base_cli();
        cli.workers = 0;
        assert!(matches!(cli.validate(), Err(ConfigError::InvalidWorkerCount(0))));
    }

    #[test]
    fn rejects_schema_id_below_sentinel() {
        let mut cli = base_cli();
        cli.schema_id = -2;
        assert!(matches!(cli.validate(), Err(ConfigError::InvalidSchemaId(-2))));
    }

    #[test]
    fn accepts_well_formed_arguments() {
        assert!(base_cli().validate().is_ok());
    }
}
