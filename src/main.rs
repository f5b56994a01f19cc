//! Binary entry point: wires configuration, logging, the database and the
//! CLI together.

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use inflation_tracker::cli::{self, Cli};
use inflation_tracker::config;
use inflation_tracker::db;
use inflation_tracker::errors::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Parse arguments first - the --db-url flag feeds path resolution
    //    and --echo-sql feeds the log filter.
    let cli = Cli::parse();

    // 2. Load .env if present (non-fatal; env vars can be set externally).
    dotenvy::dotenv().ok();

    // 3. Initialize tracing: stderr plus an append-only dated log file in
    //    the user state directory.
    init_tracing(cli.echo_sql);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Resolve the database location and bring the schema up to date. A
    // migration failure aborts here: no command may run on a stale schema.
    let database_path = config::resolve_database_path(cli.db_url.as_deref())?;
    let pool = db::init_db(&database_path).await?;

    cli::run(cli.command, &pool).await
}

fn init_tracing(echo_sql: bool) {
    // stderr stays quiet by default so command output is clean; the log file
    // keeps the full info-level trail. RUST_LOG overrides the stderr side.
    let stderr_directives = if echo_sql {
        "warn,inflation_tracker::db=debug"
    } else {
        "warn"
    };
    let file_directives = if echo_sql {
        "info,inflation_tracker::db=debug"
    } else {
        "info"
    };

    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(stderr_directives));

    let file_layer = config::logs_dir()
        .ok()
        .and_then(|dir| {
            let path = dir.join(format!(
                "inflation_{}.log",
                chrono::Local::now().format("%Y-%m-%d")
            ));
            OpenOptions::new().create(true).append(true).open(path).ok()
        })
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(EnvFilter::new(file_directives))
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(stderr_filter))
        .with(file_layer)
        .init();
}
