use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("month must be between 1 and 12, got {month}")]
    MonthOutOfRange { month: u32 },

    #[error("Failed to load configuration from {source}: {error}")]
    LoadFailed {
        source: String,
        #[source]
        error: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to read CSV header: {reason}")]
    Header { reason: String },

    #[error("Failed to parse CSV record {record}: {reason}")]
    Parse { record: u64, reason: String },

    #[error("Source contains no data rows")]
    Empty,

    #[error("Source reader terminated unexpectedly")]
    Disconnected,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to connect to destination: {reason}")]
    Connection { reason: String },

    #[error("Failed to replace table {table}: {reason}")]
    TableReplace { table: String, reason: String },

    #[error("Failed to append batch to {table}: {reason}")]
    Write { table: String, reason: String },
}

pub type Result<T> = std::result::Result<T, IngestionError>;
