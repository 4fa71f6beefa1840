use std::collections::VecDeque;
use std::sync::Arc;

use ingest_core::Ingestor;
use ingest_core::errors::{IngestionError, SinkError, SourceError};
use ingest_core::schema::{Record, RecordBatch, TableSchema, Value};
use ingest_core::sink::Sink;
use ingest_core::source::Source;

fn trip_schema() -> Arc<TableSchema> {
    Arc::new(TableSchema::from_header([
        "VendorID",
        "tpep_pickup_datetime",
        "fare_amount",
    ]))
}

fn record(vendor: i64, fare: f64) -> Record {
    Record {
        values: vec![
            Value::BigInt(Some(vendor)),
            Value::Timestamp(None),
            Value::Double(Some(fare)),
        ],
    }
}

/// Splits `rows` records into batches of `batch_size`, the way the CSV
/// source would.
fn batches(schema: &Arc<TableSchema>, rows: usize, batch_size: usize) -> VecDeque<RecordBatch> {
    let records: Vec<Record> = (0..rows).map(|i| record(i as i64, i as f64 + 0.5)).collect();
    records
        .chunks(batch_size)
        .map(|chunk| RecordBatch {
            schema: Arc::clone(schema),
            records: chunk.to_vec(),
            bytes: chunk.len() as u64 * 10,
        })
        .collect()
}

struct MemorySource {
    batches: VecDeque<RecordBatch>,
}

impl Source for MemorySource {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        Ok(self.batches.pop_front())
    }
}

#[derive(Debug, PartialEq)]
enum SinkCall {
    ReplaceTable(Vec<String>),
    AppendBatch(usize),
}

/// Records the sink calls and accumulates rows, standing in for the table.
#[derive(Default)]
struct RecordingSink {
    calls: Vec<SinkCall>,
    rows: Vec<Record>,
}

impl Sink for RecordingSink {
    async fn replace_table(&mut self, schema: &TableSchema) -> Result<(), SinkError> {
        self.calls.push(SinkCall::ReplaceTable(
            schema.column_names().map(str::to_string).collect(),
        ));
        self.rows.clear();
        Ok(())
    }

    async fn append_batch(&mut self, batch: &RecordBatch) -> Result<u64, SinkError> {
        self.calls.push(SinkCall::AppendBatch(batch.len()));
        self.rows.extend(batch.records.iter().cloned());
        Ok(batch.len() as u64)
    }
}

#[tokio::test]
async fn test_all_records_land_in_ceil_n_over_b_appends() {
    let schema = trip_schema();
    let source = MemorySource {
        batches: batches(&schema, 10, 3),
    };
    let mut sink = RecordingSink::default();

    let metrics = Ingestor::new(source, &mut sink).run().await.unwrap();

    // 10 records at batch size 3 -> 4 appends, schema replacement first
    assert_eq!(sink.calls.len(), 5);
    assert_eq!(
        sink.calls[0],
        SinkCall::ReplaceTable(vec![
            "VendorID".to_string(),
            "tpep_pickup_datetime".to_string(),
            "fare_amount".to_string(),
        ])
    );
    assert_eq!(
        &sink.calls[1..],
        &[
            SinkCall::AppendBatch(3),
            SinkCall::AppendBatch(3),
            SinkCall::AppendBatch(3),
            SinkCall::AppendBatch(1),
        ]
    );
    assert_eq!(metrics.rows_ingested, 10);
    assert_eq!(metrics.batches_ingested, 4);

    // source order is preserved end to end
    let vendors: Vec<Value> = sink.rows.iter().map(|r| r.values[0].clone()).collect();
    let expected: Vec<Value> = (0..10).map(|i| Value::BigInt(Some(i))).collect();
    assert_eq!(vendors, expected);
}

#[tokio::test]
async fn test_first_batch_is_appended_too() {
    let schema = trip_schema();
    let source = MemorySource {
        batches: batches(&schema, 2, 5),
    };
    let mut sink = RecordingSink::default();

    Ingestor::new(source, &mut sink).run().await.unwrap();

    assert_eq!(
        sink.calls
            .iter()
            .filter(|c| matches!(c, SinkCall::AppendBatch(_)))
            .count(),
        1
    );
    assert_eq!(sink.rows.len(), 2);
}

#[tokio::test]
async fn test_empty_source_fails_without_touching_the_sink() {
    let source = MemorySource {
        batches: VecDeque::new(),
    };
    let mut sink = RecordingSink::default();

    let result = Ingestor::new(source, &mut sink).run().await;
    assert!(matches!(
        result,
        Err(IngestionError::Source(SourceError::Empty))
    ));
    assert!(sink.calls.is_empty());
}

#[tokio::test]
async fn test_rerun_replaces_previous_contents() {
    let schema = trip_schema();
    let mut sink = RecordingSink::default();

    let first = MemorySource {
        batches: batches(&schema, 4, 2),
    };
    Ingestor::new(first, &mut sink).run().await.unwrap();
    assert_eq!(sink.rows.len(), 4);

    let second = MemorySource {
        batches: batches(&schema, 3, 2),
    };
    Ingestor::new(second, &mut sink).run().await.unwrap();

    // the second run's replace drops the prior rows entirely
    assert_eq!(sink.rows.len(), 3);
    let replaces = sink
        .calls
        .iter()
        .filter(|c| matches!(c, SinkCall::ReplaceTable(_)))
        .count();
    assert_eq!(replaces, 2);
}

#[tokio::test]
async fn test_sink_failure_aborts_the_run() {
    struct FailingSink;

    impl Sink for FailingSink {
        async fn replace_table(&mut self, _schema: &TableSchema) -> Result<(), SinkError> {
            Ok(())
        }

        async fn append_batch(&mut self, _batch: &RecordBatch) -> Result<u64, SinkError> {
            Err(SinkError::Write {
                table: "yellow_taxi_data".to_string(),
                reason: "connection reset".to_string(),
            })
        }
    }

    let schema = trip_schema();
    let source = MemorySource {
        batches: batches(&schema, 4, 2),
    };
    let result = Ingestor::new(source, FailingSink).run().await;
    assert!(matches!(result, Err(IngestionError::Sink(_))));
}
