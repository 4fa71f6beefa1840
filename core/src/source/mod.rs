pub mod csv_http;

pub use csv_http::CsvSource;

use crate::errors::SourceError;
use crate::schema::RecordBatch;

/// A lazy, forward-only, finite sequence of row batches.
#[allow(async_fn_in_trait)]
pub trait Source {
    /// Returns the next batch in arrival order, or `None` once the source is
    /// exhausted. After an error the source is dead; callers must not retry.
    async fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError>;
}
