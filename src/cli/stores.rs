use clap::Subcommand;

use crate::cli::ListArgs;
use crate::cli::output::{print_record, print_records};
use crate::db::{self, DbPool};
use crate::errors::Result;

/// `store` subcommands.
#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Add a new store.
    Add {
        /// Unique store name (case-insensitive).
        name: String,
        /// Optional description.
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// List stores, ordered by name.
    List(ListArgs),
    /// Show one store.
    Get { id: i64 },
    /// Update a store; omitted fields stay unchanged.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// Delete a store (blocked while purchases reference it).
    Delete { id: i64 },
}

pub async fn run(pool: &DbPool, command: StoreCommand) -> Result<()> {
    match command {
        StoreCommand::Add { name, description } => {
            let id = db::add_store(pool, &name, description.as_deref()).await?;
            print_record(&db::get_store(pool, id).await?);
        }
        StoreCommand::List(args) => {
            let stores = db::list_stores(pool, args.name.as_deref(), args.offset, args.limit).await?;
            print_records(&stores, args.output.mode());
        }
        StoreCommand::Get { id } => {
            print_record(&db::get_store(pool, id).await?);
        }
        StoreCommand::Update {
            id,
            name,
            description,
        } => {
            let updated = db::update_store(pool, id, name.as_deref(), description.as_deref()).await?;
            print_record(&updated);
        }
        StoreCommand::Delete { id } => {
            db::delete_store(pool, id).await?;
            println!("Deleted store {}", id);
        }
    }
    Ok(())
}
