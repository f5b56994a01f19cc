use clap::Subcommand;

use crate::cli::ListArgs;
use crate::cli::output::{print_record, print_records};
use crate::db::{self, DbPool};
use crate::errors::Result;

/// `category` subcommands.
#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Add a new category.
    Add {
        /// Unique category name (case-insensitive).
        name: String,
        /// Optional description.
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// List categories, ordered by name.
    List(ListArgs),
    /// Show one category.
    Get { id: i64 },
    /// Update a category; omitted fields stay unchanged.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
    },
    /// Delete a category (blocked while products reference it).
    Delete { id: i64 },
}

pub async fn run(pool: &DbPool, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Add { name, description } => {
            let id = db::add_category(pool, &name, description.as_deref()).await?;
            print_record(&db::get_category(pool, id).await?);
        }
        CategoryCommand::List(args) => {
            let categories =
                db::list_categories(pool, args.name.as_deref(), args.offset, args.limit).await?;
            print_records(&categories, args.output.mode());
        }
        CategoryCommand::Get { id } => {
            print_record(&db::get_category(pool, id).await?);
        }
        CategoryCommand::Update {
            id,
            name,
            description,
        } => {
            let updated =
                db::update_category(pool, id, name.as_deref(), description.as_deref()).await?;
            print_record(&updated);
        }
        CategoryCommand::Delete { id } => {
            db::delete_category(pool, id).await?;
            println!("Deleted category {}", id);
        }
    }
    Ok(())
}
