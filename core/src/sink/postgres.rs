use futures::pin_mut;
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::errors::SinkError;
use crate::schema::{RecordBatch, TableSchema};
use crate::sink::Sink;

/// PostgreSQL sink. Schema replacement is plain DDL; appends go through the
/// binary COPY protocol, which is the fast path for bulk loads.
pub struct PostgresSink {
    client: Client,
    table: String,
}

impl PostgresSink {
    /// Connects and drives the connection on a background task.
    pub async fn connect(conn_str: &str, table: &str) -> Result<Self, SinkError> {
        let (client, connection) =
            tokio_postgres::connect(conn_str, NoTls)
                .await
                .map_err(|e| SinkError::Connection {
                    reason: e.to_string(),
                })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {e}");
            }
        });
        Ok(Self {
            client,
            table: table.to_string(),
        })
    }
}

impl Sink for PostgresSink {
    async fn replace_table(&mut self, schema: &TableSchema) -> Result<(), SinkError> {
        let map_err = |e: tokio_postgres::Error| SinkError::TableReplace {
            table: self.table.clone(),
            reason: e.to_string(),
        };
        self.client
            .execute(&drop_table_sql(&self.table), &[])
            .await
            .map_err(map_err)?;
        self.client
            .execute(&create_table_sql(&self.table, schema), &[])
            .await
            .map_err(map_err)?;
        info!(table = %self.table, columns = schema.columns.len(), "replaced destination table");
        Ok(())
    }

    async fn append_batch(&mut self, batch: &RecordBatch) -> Result<u64, SinkError> {
        let map_err = |e: tokio_postgres::Error| SinkError::Write {
            table: self.table.clone(),
            reason: e.to_string(),
        };
        let sink = self
            .client
            .copy_in(&copy_in_sql(&self.table, &batch.schema))
            .await
            .map_err(map_err)?;
        let types = batch.schema.pg_types();
        let writer = BinaryCopyInWriter::new(sink, &types);
        pin_mut!(writer);
        for record in &batch.records {
            let row: Vec<&(dyn ToSql + Sync)> =
                record.values.iter().map(|v| v.as_sql()).collect();
            writer.as_mut().write(&row).await.map_err(map_err)?;
        }
        let rows = writer.finish().await.map_err(map_err)?;
        debug!(table = %self.table, rows, "copied batch");
        Ok(rows)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

fn create_table_sql(table: &str, schema: &TableSchema) -> String {
    let columns = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.data_type.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), columns)
}

fn copy_in_sql(table: &str, schema: &TableSchema) -> String {
    let columns = schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("COPY {} ({}) FROM STDIN BINARY", quote_ident(table), columns)
}
