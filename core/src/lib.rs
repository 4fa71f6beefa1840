pub mod config;
pub mod errors;
pub mod ingestor;
pub mod schema;
pub mod sink;
pub mod source;
pub mod telemetry;

pub use config::IngestConfig;
pub use errors::{IngestionError, Result};
pub use ingestor::Ingestor;
pub use telemetry::IngestMetrics;
