//! Exporters: the output sinks a worker writes rows to.
//!
//! A closed polymorphic variant -- `ContainerFile` or `Broker` -- dispatched
//! at construction time per worker, never per row. Each worker owns exactly
//! one exporter instance; it is never shared between workers.

use std::fs::File;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use apache_avro::types::Value as AvroValue;
use apache_avro::Codec;
use rdkafka::config::ClientConfig;
use rdkafka::message::ToBytes;
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, Producer, ProducerContext};
use rdkafka::ClientContext;

use crate::avro_codec::{encode_datum, wire_envelope};
use crate::error::ExportError;
use crate::record::Record;
use crate::registry::RegistryClient;
use crate::schema::RowDescriptor;

/// The capability set every sink exposes: `setup`, `export_row`, `finish`.
/// `finish` is called exactly once, after the worker's shard is fully
/// processed.
pub trait Exporter {
    fn setup(&mut self) -> Result<(), ExportError>;
    fn export_row(&mut self, record: &Record) -> Result<(), ExportError>;
    fn finish(&mut self) -> Result<(), ExportError>;
}

/// Configuration shared by every worker's exporter, built once by the
/// orchestrator and handed to each worker at construction.
pub struct ExporterConfig {
    pub row: Arc<RowDescriptor>,
    pub avro_schema: Arc<apache_avro::Schema>,
    pub avro_schema_json: Arc<String>,
}

/// Sink selection: a prefix of `http://` or `https://` selects the broker
/// exporter; any other value selects the container-file exporter.
pub enum SinkTarget {
    Broker { broker_addr: String },
    ContainerFile { base_path: String },
}

pub fn select_sink(sink_url: &str) -> SinkTarget {
    if let Some(rest) = sink_url.strip_prefix("https://") {
        SinkTarget::Broker {
            broker_addr: rest.to_string(),
        }
    } else if let Some(rest) = sink_url.strip_prefix("http://") {
        SinkTarget::Broker {
            broker_addr: rest.to_string(),
        }
    } else {
        SinkTarget::ContainerFile {
            base_path: sink_url.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Container-File Exporter
// ---------------------------------------------------------------------------

/// Opens `<base>.<worker_index>`, truncating if present, and wraps it in an
/// Avro container-file encoder (Snappy by default). Workers write independent
/// files so no writer synchronization is needed across threads.
///
/// Rows are converted to `AvroValue`s as they arrive and buffered; the
/// `apache_avro::Writer` itself is constructed once, in `finish`, since it
/// borrows the schema and this exporter's schema is shared (`Arc`) across
/// every worker rather than owned per-exporter.
pub struct ContainerFileExporter {
    file_path: std::path::PathBuf,
    config: Arc<ExporterConfig>,
    buffered: Vec<AvroValue>,
}

impl ContainerFileExporter {
    pub fn new(base_path: &str, worker_index: usize, config: Arc<ExporterConfig>) -> Self {
        Self {
            file_path: Path::new(&format!("{base_path}.{worker_index}")).to_path_buf(),
            config,
            buffered: Vec::new(),
        }
    }
}

impl Exporter for ContainerFileExporter {
    fn setup(&mut self) -> Result<(), ExportError> {
        Ok(())
    }

    fn export_row(&mut self, record: &Record) -> Result<(), ExportError> {
        let value = crate::avro_codec::record_to_avro_value(record, &self.config.row, &self.config.avro_schema)?;
        self.buffered.push(value);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        let file = File::create(&self.file_path).map_err(|source| ExportError::OpenFailed {
            path: self.file_path.clone(),
            source,
        })?;

        let mut writer = apache_avro::Writer::with_codec(self.config.avro_schema.as_ref(), file, Codec::Snappy);
        for value in self.buffered.drain(..) {
            writer.append(value)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Broker Exporter
// ---------------------------------------------------------------------------

struct DeliveryContext {
    sender: mpsc::Sender<Result<(), String>>,
}

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = ();

    fn delivery(&self, report: &DeliveryResult<'_>, _: Self::DeliveryOpaque) {
        let result = match report {
            Ok(_) => Ok(()),
            Err((kafka_error, _)) => Err(kafka_error.to_string()),
        };
        let _ = self.sender.send(result);
    }
}

/// Constructs a producer bound to `(topic, partition = worker_index)`. The
/// key is the literal string `"string"` Avro-encoded with a primitive string
/// schema and wrapped in the same wire envelope as the value, cached once at
/// setup. The value schema id either comes pre-registered from configuration
/// or is resolved against the registry at setup; the key schema id is always
/// resolved against the registry, since nothing upstream pre-registers it.
pub struct BrokerExporter {
    topic: String,
    partition: i32,
    config: Arc<ExporterConfig>,
    registry: Arc<RegistryClient>,
    schema_subject: String,
    schema_subject_key: String,
    schema_id: u32,
    pre_registered_schema_id: Option<u32>,
    bootstrap_servers: String,
    tls: Option<TlsMaterial>,

    producer: Option<BaseProducer<DeliveryContext>>,
    key_schema: apache_avro::Schema,
    key_schema_id: u32,
    key_bytes: Vec<u8>,
    receiver: Option<mpsc::Receiver<Result<(), String>>>,
}

#[derive(Clone)]
pub struct TlsMaterial {
    pub ca_file: String,
    pub key_file: String,
    pub certificate_file: String,
}

impl BrokerExporter {
    pub fn new(
        topic: String,
        partition: i32,
        bootstrap_servers: String,
        tls: Option<TlsMaterial>,
        config: Arc<ExporterConfig>,
        registry: Arc<RegistryClient>,
        pre_registered_schema_id: Option<u32>,
    ) -> Self {
        // Cached once per exporter instance: the key schema is parsed a
        // single time at producer construction, not per row.
        let key_schema = apache_avro::Schema::parse_str(r#""string""#).expect("primitive string schema is valid");

        Self {
            schema_subject: format!("{topic}-value"),
            schema_subject_key: format!("{topic}-key"),
            topic,
            partition,
            config,
            registry,
            schema_id: 0,
            pre_registered_schema_id,
            bootstrap_servers,
            tls,
            producer: None,
            key_schema,
            key_schema_id: 0,
            key_bytes: Vec::new(),
            receiver: None,
        }
    }
}

impl Exporter for BrokerExporter {
    fn setup(&mut self) -> Result<(), ExportError> {
        self.schema_id = match self.pre_registered_schema_id {
            Some(id) => id,
            None => self
                .registry
                .register(&self.schema_subject, &self.config.avro_schema_json)?,
        };

        self.key_schema_id = self.registry.register(&self.schema_subject_key, r#""string""#)?;

        let key_value = apache_avro::types::Value::String("string".to_string());
        let key_datum = apache_avro::to_avro_datum(&self.key_schema, key_value)?;
        self.key_bytes = wire_envelope(self.key_schema_id, &key_datum);

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("socket.keepalive.enable", "true")
            .set("log.connection.close", "false");

        if let Some(tls) = &self.tls {
            client_config
                .set("security.protocol", "ssl")
                .set("ssl.ca.location", &tls.ca_file)
                .set("ssl.key.location", &tls.key_file)
                .set("ssl.certificate.location", &tls.certificate_file);
        }

        let (sender, receiver) = mpsc::channel();
        let producer: BaseProducer<DeliveryContext> = client_config
            .create_with_context(DeliveryContext { sender })
            .map_err(|e| ExportError::Registry(format!("could not create kafka producer: {e}")))?;

        self.producer = Some(producer);
        self.receiver = Some(receiver);
        Ok(())
    }

    fn export_row(&mut self, record: &Record) -> Result<(), ExportError> {
        let producer = self.producer.as_ref().expect("setup() must run before export_row()");
        let avro_payload = encode_datum(record, &self.config.row, &self.config.avro_schema)?;
        let value_bytes = wire_envelope(self.schema_id, &avro_payload);

        // Submits without blocking under normal conditions.
        let send_result = producer.send(
            BaseRecord::to(&self.topic)
                .partition(self.partition)
                .payload(value_bytes.to_bytes())
                .key(self.key_bytes.to_bytes()),
        );

        if let Err((kafka_error, _)) = send_result {
            return Err(ExportError::KafkaDelivery(kafka_error.to_string()));
        }

        // Drive the delivery callback loop so the channel eventually receives
        // an event; non-blocking poll, matching `socket.keepalive.enable`'s
        // cooperative style rather than a blocking flush per row.
        producer.poll(Duration::from_millis(0));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        // Waits for exactly one delivery event rather than draining every
        // in-flight message; DESIGN.md records the decision.
        if let Some(producer) = &self.producer {
            producer.flush(Duration::from_secs(30)).ok();
        }

        if let Some(receiver) = &self.receiver {
            match receiver.recv_timeout(Duration::from_secs(30)) {
                Ok(Err(reason)) => return Err(ExportError::KafkaDelivery(reason)),
                Ok(Ok(())) | Err(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_broker_for_http_prefix() {
        assert!(matches!(
            select_sink("http://broker:9092"),
            SinkTarget::Broker { .. }
        ));
        assert!(matches!(
            select_sink("https://broker:9092"),
            SinkTarget::Broker { .. }
        ));
    }

    #[test]
    fn selects_container_file_for_plain_path() {
        assert!(matches!(
            select_sink("/tmp/out"),
            SinkTarget::ContainerFile { .. }
        ));
    }

    #[test]
    fn broker_address_strips_scheme() {
        let SinkTarget::Broker { broker_addr } = select_sink("http://10.1.1.90:9092") else {
            panic!("expected broker target");
        };
        assert_eq!(broker_addr, "10.1.1.90:9092");
    }
}
