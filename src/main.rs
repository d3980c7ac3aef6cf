//! HETS rotation maintenance tool
//!
//! Usage:
//!   hets-rotation show <ID>
//!   hets-rotation recalc <ID>
//!   hets-rotation blocks

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use hets_rotation::{
    config::{AppConfig, LoggingConfig},
    error::ErrorResponse,
    repository::Repository,
    services::Services,
    AppResult,
};

#[derive(Parser)]
#[command(name = "hets-rotation")]
#[command(about = "HETS rental request rotation list maintenance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a rental request with its rotation list
    Show {
        /// Rental request id
        id: i32,
    },
    /// Rebuild the rotation list of an in-progress rental request
    Recalc {
        /// Rental request id
        id: i32,
    },
    /// Print the configured seniority block counts
    Blocks,
}

#[derive(Serialize)]
struct BlockCounts {
    default_total_blocks: i32,
    dump_truck_total_blocks: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _guard = init_tracing(&config.logging);

    tracing::info!("Starting HETS rotation tool v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations completed");
    }

    let services = Services::new(Arc::new(Repository::new(pool)), &config.scoring);
    let rental_requests = &services.rental_requests;

    match cli.command {
        Command::Show { id } => print(rental_requests.get(id).await),
        Command::Recalc { id } => print(rental_requests.recalculate(id).await),
        Command::Blocks => print(Ok(BlockCounts {
            default_total_blocks: rental_requests.block_count(false),
            dump_truck_total_blocks: rental_requests.block_count(true),
        })),
    }
}

/// Write the result as JSON on stdout, or the structured error on stderr
fn print<T: Serialize>(result: AppResult<T>) -> anyhow::Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&err))?);
            Err(err.into())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("hets_rotation={},sqlx=warn", logging.level).into());

    let console = if logging.format == "json" {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "hets-rotation.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(writer).boxed()),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}
