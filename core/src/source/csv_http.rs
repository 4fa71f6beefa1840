use std::fs::File;
use std::io::{BufReader, Read};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::SourceError;
use crate::schema::{RecordBatch, TableSchema};
use crate::source::Source;

/// Parsed batches the reader task may buffer ahead of the writer.
const CHANNEL_DEPTH: usize = 2;

/// Reads a gzip-compressed (or plain) CSV resource as a lazy sequence of
/// typed row batches.
///
/// The locator is fetched over HTTP(S) when it looks like a URL, otherwise it
/// is opened as a local path. Decompression is keyed off the `.gz` suffix,
/// matching the release file naming. All blocking I/O (HTTP body, gunzip,
/// CSV decode) runs on a `spawn_blocking` task that feeds a bounded channel,
/// so the async side sees batches in arrival order with bounded memory.
pub struct CsvSource {
    rx: mpsc::Receiver<ReaderMessage>,
    done: bool,
}

/// The reader finishes a clean run with an explicit `Done`; a channel that
/// closes without one means the reader died mid-stream.
enum ReaderMessage {
    Batch(RecordBatch),
    Done,
    Failed(SourceError),
}

impl CsvSource {
    /// Starts the reader task. Must be called from within a tokio runtime.
    pub fn open(locator: &str, batch_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let locator = locator.to_string();
        tokio::task::spawn_blocking(move || read_loop(&locator, batch_size, &tx));
        Self { rx, done: false }
    }
}

impl Source for CsvSource {
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        if self.done {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(ReaderMessage::Batch(batch)) => Ok(Some(batch)),
            Some(ReaderMessage::Done) => {
                self.done = true;
                Ok(None)
            }
            Some(ReaderMessage::Failed(e)) => {
                self.done = true;
                Err(e)
            }
            None => {
                self.done = true;
                Err(SourceError::Disconnected)
            }
        }
    }
}

fn read_loop(locator: &str, batch_size: usize, tx: &mpsc::Sender<ReaderMessage>) {
    // Failed sends to a receiver that is already gone; nothing left to
    // report to them in that case.
    match read_batches(locator, batch_size, tx) {
        Ok(()) => {
            let _ = tx.blocking_send(ReaderMessage::Done);
        }
        Err(e) => {
            let _ = tx.blocking_send(ReaderMessage::Failed(e));
        }
    }
}

fn open_reader(locator: &str) -> Result<Box<dyn Read + Send>, SourceError> {
    let raw: Box<dyn Read + Send> =
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let response = reqwest::blocking::get(locator)
                .and_then(|r| r.error_for_status())
                .map_err(|e| SourceError::Fetch {
                    url: locator.to_string(),
                    reason: e.to_string(),
                })?;
            Box::new(response)
        } else {
            let file = File::open(locator).map_err(|e| SourceError::Fetch {
                url: locator.to_string(),
                reason: e.to_string(),
            })?;
            Box::new(BufReader::new(file))
        };
    Ok(if locator.ends_with(".gz") {
        Box::new(GzDecoder::new(raw))
    } else {
        raw
    })
}

fn read_batches(
    locator: &str,
    batch_size: usize,
    tx: &mpsc::Sender<ReaderMessage>,
) -> Result<(), SourceError> {
    let reader = open_reader(locator)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| SourceError::Header {
            reason: e.to_string(),
        })?
        .clone();
    let schema = Arc::new(TableSchema::from_header(headers.iter()));
    info!(
        columns = schema.columns.len(),
        locator, "derived schema from source header"
    );

    let mut records = Vec::with_capacity(batch_size);
    let mut bytes: u64 = 0;
    let mut row: u64 = 0;
    for result in csv_reader.records() {
        let raw = result.map_err(|e| SourceError::Parse {
            record: row + 1,
            reason: e.to_string(),
        })?;
        row += 1;
        bytes += raw.as_slice().len() as u64;
        let record = schema
            .parse_row(raw.iter())
            .map_err(|reason| SourceError::Parse { record: row, reason })?;
        records.push(record);

        if records.len() == batch_size {
            let batch = RecordBatch {
                schema: Arc::clone(&schema),
                records: std::mem::replace(&mut records, Vec::with_capacity(batch_size)),
                bytes,
            };
            bytes = 0;
            debug!(rows = batch.len(), "batch ready");
            if tx.blocking_send(ReaderMessage::Batch(batch)).is_err() {
                // Receiver dropped mid-run; stop reading.
                return Ok(());
            }
        }
    }

    if !records.is_empty() {
        let _ = tx.blocking_send(ReaderMessage::Batch(RecordBatch {
            schema,
            records,
            bytes,
        }));
    }
    Ok(())
}
