use anyhow::Result;
use clap::Parser;
use tracing::info;

use ingest_core::config::{DatabaseConfig, IngestConfig, ProcessingConfig, SourceConfig};
use ingest_core::telemetry::init_tracing;

/// Loads one month of yellow-taxi trip records into PostgreSQL.
///
/// Downloads the gzip-compressed CSV for the given year/month, replaces the
/// target table's schema from the file header, and appends every batch.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Path to a configuration file (YAML or JSON); the flags below
    /// override its values.
    #[arg(long)]
    config: Option<String>,

    /// PostgreSQL username [default: root]
    #[arg(long)]
    pg_user: Option<String>,

    /// PostgreSQL password [default: root]
    #[arg(long)]
    pg_pass: Option<String>,

    /// PostgreSQL host [default: localhost]
    #[arg(long)]
    pg_host: Option<String>,

    /// PostgreSQL port [default: 5432]
    #[arg(long)]
    pg_port: Option<u16>,

    /// PostgreSQL database name [default: ny_taxi]
    #[arg(long)]
    pg_db: Option<String>,

    /// Year of the data [default: 2021]
    #[arg(long)]
    year: Option<u32>,

    /// Month of the data (1-12) [default: 1]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Batch size for ingestion [default: 100000]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Target table name [default: yellow_taxi_data]
    #[arg(long)]
    target_table: Option<String>,
}

fn default_config() -> IngestConfig {
    IngestConfig {
        database: DatabaseConfig {
            user: "root".to_string(),
            password: "root".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            dbname: "ny_taxi".to_string(),
        },
        source: SourceConfig {
            year: 2021,
            month: 1,
            url: None,
        },
        processing: ProcessingConfig::default(),
        target_table: "yellow_taxi_data".to_string(),
    }
}

fn merge_cli(config: &mut IngestConfig, args: &CliArgs) {
    if let Some(u) = &args.pg_user {
        config.database.user = u.clone();
    }
    if let Some(p) = &args.pg_pass {
        config.database.password = p.clone();
    }
    if let Some(h) = &args.pg_host {
        config.database.host = h.clone();
    }
    if let Some(p) = args.pg_port {
        config.database.port = p;
    }
    if let Some(d) = &args.pg_db {
        config.database.dbname = d.clone();
    }
    if let Some(y) = args.year {
        config.source.year = y;
    }
    if let Some(m) = args.month {
        config.source.month = m;
    }
    if let Some(b) = args.batch_size {
        config.processing.batch_size = b;
    }
    if let Some(t) = &args.target_table {
        config.target_table = t.clone();
    }
}

/// Builds the run configuration: `--config <file>`, else the `INGEST_CONFIG`
/// environment variable, else built-in defaults; flags passed on the command
/// line override whichever base was loaded.
fn build_config(args: &CliArgs) -> Result<IngestConfig> {
    let mut config = match &args.config {
        Some(path) => IngestConfig::from_file(path)?,
        None if std::env::var("INGEST_CONFIG").is_ok() => IngestConfig::from_env()?,
        None => default_config(),
    };
    merge_cli(&mut config, args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = build_config(&args)?;
    // also covers file-loaded configs, before any network or database I/O
    config.validate()?;

    let metrics = ingest_core::ingestor::run(&config).await?;
    info!(
        rows = metrics.rows_ingested,
        batches = metrics.batches_ingested,
        "done ingesting to {}",
        config.target_table
    );
    Ok(())
}
