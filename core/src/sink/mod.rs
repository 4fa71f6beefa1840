pub mod postgres;

pub use postgres::PostgresSink;

use crate::errors::SinkError;
use crate::schema::{RecordBatch, TableSchema};

/// The `Sink` trait defines the contract for the destination system.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Destructively create-or-replace the target table with the column
    /// layout of `schema`. Any pre-existing table of the same name and its
    /// data are discarded.
    async fn replace_table(&mut self, schema: &TableSchema) -> Result<(), SinkError>;

    /// Append every record of `batch` to the target table, preserving
    /// record order. Returns the number of rows written.
    async fn append_batch(&mut self, batch: &RecordBatch) -> Result<u64, SinkError>;
}

impl<T: Sink> Sink for &mut T {
    async fn replace_table(&mut self, schema: &TableSchema) -> Result<(), SinkError> {
        (**self).replace_table(schema).await
    }

    async fn append_batch(&mut self, batch: &RecordBatch) -> Result<u64, SinkError> {
        (**self).append_batch(batch).await
    }
}
