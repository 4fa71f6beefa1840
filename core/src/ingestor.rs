use tracing::info;

use crate::config::IngestConfig;
use crate::errors::{IngestionError, SourceError};
use crate::schema::RecordBatch;
use crate::sink::{PostgresSink, Sink};
use crate::source::{CsvSource, Source};
use crate::telemetry::IngestMetrics;

/// The ingestor orchestrates the data flow from source -> sink.
///
/// The run is a two-phase protocol: the first batch fixes the destination
/// schema (zero-row projection of its header), the table is destructively
/// replaced with that layout, and then every batch, the first included, is
/// appended in arrival order. There is no checkpointing and no partial
/// recovery; the first failure aborts the run.
pub struct Ingestor<S, K> {
    source: S,
    sink: K,
    metrics: IngestMetrics,
}

impl<S: Source, K: Sink> Ingestor<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            metrics: IngestMetrics::default(),
        }
    }

    /// Drains the source into the sink. A source with zero data rows is an
    /// error: there is no batch to derive the schema from, and the
    /// destination is left untouched.
    pub async fn run(mut self) -> Result<IngestMetrics, IngestionError> {
        let first = self
            .source
            .next_batch()
            .await?
            .ok_or(SourceError::Empty)?;

        self.sink.replace_table(&first.schema).await?;
        self.append(first).await?;

        while let Some(batch) = self.source.next_batch().await? {
            self.append(batch).await?;
        }

        info!(
            rows = self.metrics.rows_ingested,
            batches = self.metrics.batches_ingested,
            bytes = self.metrics.bytes_read,
            "ingestion complete"
        );
        Ok(self.metrics)
    }

    async fn append(&mut self, batch: RecordBatch) -> Result<(), IngestionError> {
        let rows = self.sink.append_batch(&batch).await?;
        self.metrics.batches_ingested += 1;
        self.metrics.rows_ingested += rows;
        self.metrics.bytes_read += batch.bytes;
        info!(
            batch = self.metrics.batches_ingested,
            rows, "appended batch"
        );
        Ok(())
    }
}

/// Wires the HTTP CSV source and Postgres sink from `config` and runs a full
/// ingestion. This is the entry point used by the runners.
pub async fn run(config: &IngestConfig) -> Result<IngestMetrics, IngestionError> {
    config.validate()?;
    let url = config.source_url();
    info!(%url, table = %config.target_table, batch_size = config.processing.batch_size, "starting ingestion");

    let source = CsvSource::open(&url, config.processing.batch_size);
    let sink = PostgresSink::connect(&config.connection_string(), &config.target_table).await?;
    Ingestor::new(source, sink).run().await
}
