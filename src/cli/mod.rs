//! Command-line surface: one closed subcommand enum per entity, matched
//! exhaustively, all dispatching into the same data-access functions.

pub mod categories;
pub mod output;
pub mod plot;
pub mod products;
pub mod purchases;
pub mod stores;
pub mod trend;
pub mod units;

use clap::{Args, Parser, Subcommand};

use crate::db::DbPool;
use crate::errors::Result;
use output::OutputFlags;

/// Top-level CLI for the purchase-based inflation tracker.
#[derive(Debug, Parser)]
#[command(name = "inflation", version, about = "CLI for the purchase-based inflation tracker")]
pub struct Cli {
    /// Database file path (overrides the DB_URL environment variable).
    #[arg(long = "db-url", global = true)]
    pub db_url: Option<String>,

    /// Log the SQL issued by the data-access layer.
    #[arg(long = "echo-sql", global = true)]
    pub echo_sql: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Every operation the application supports.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage product categories.
    #[command(subcommand)]
    Category(categories::CategoryCommand),

    /// Manage measurement units.
    #[command(subcommand)]
    Units(units::UnitCommand),

    /// Manage stores.
    #[command(subcommand)]
    Store(stores::StoreCommand),

    /// Manage products.
    #[command(subcommand)]
    Product(products::ProductCommand),

    /// Manage purchases.
    #[command(subcommand)]
    Purchase(purchases::PurchaseCommand),

    /// Unit-price trend of one product over time.
    Trend(trend::TrendArgs),
}

/// Pagination and output options shared by every reference-table `list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only records whose name starts with this prefix (case-insensitive).
    #[arg(long)]
    pub name: Option<String>,

    /// Pagination offset.
    #[arg(short = 'o', long, default_value_t = 0)]
    pub offset: i64,

    /// Pagination limit; negative means no limit.
    #[arg(short = 'l', long, default_value_t = 100)]
    pub limit: i64,

    #[command(flatten)]
    pub output: OutputFlags,
}

/// Dispatches a parsed command against the shared data-access layer.
pub async fn run(command: Command, pool: &DbPool) -> Result<()> {
    match command {
        Command::Category(cmd) => categories::run(pool, cmd).await,
        Command::Units(cmd) => units::run(pool, cmd).await,
        Command::Store(cmd) => stores::run(pool, cmd).await,
        Command::Product(cmd) => products::run(pool, cmd).await,
        Command::Purchase(cmd) => purchases::run(pool, cmd).await,
        Command::Trend(args) => trend::run(pool, args).await,
    }
}
