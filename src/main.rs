//! db-table-mapper - run one query and print the result set as a JSON table.

use clap::Parser;
use db_table_mapper::{Config, DbProvider, DbResult, DataTable};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout carries only the table.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // try_init: a second initialization is a no-op, not a panic
    let _ = if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

async fn run(config: &Config) -> DbResult<DataTable> {
    let provider = DbProvider::from_url(&config.database)?;
    let query = config.query.clone();
    let transactional = config.transactional;

    provider
        .connect(move |conn| {
            Box::pin(async move {
                if transactional {
                    conn.transaction(move |tx| {
                        Box::pin(async move { tx.query_table(&query, &[]).await })
                    })
                    .await
                } else {
                    conn.query_table(&query, &[]).await
                }
            })
        })
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        transactional = config.transactional,
        "Starting db-table-mapper v{}",
        env!("CARGO_PKG_VERSION")
    );

    let table = match run(&config).await {
        Ok(table) => table,
        Err(e) => {
            error!(error = %e, suggestion = ?e.suggestion(), "Query failed");
            return Err(e.into());
        }
    };

    info!(
        columns = table.columns().len(),
        rows = table.row_count(),
        "Query complete"
    );

    let json = if config.pretty {
        serde_json::to_string_pretty(&table)?
    } else {
        serde_json::to_string(&table)?
    };
    println!("{}", json);

    Ok(())
}
