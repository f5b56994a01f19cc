use clap::Subcommand;

use crate::cli::ListArgs;
use crate::cli::output::{print_record, print_records};
use crate::db::{self, DbPool, ProductUpdate};
use crate::errors::Result;

/// `product` subcommands.
#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Add a new product.
    Add {
        /// Unique product name (case-insensitive).
        name: String,
        /// Category the product belongs to.
        #[arg(short = 'c', long)]
        category_id: i64,
        /// Unit its quantities are measured in.
        #[arg(short = 'u', long)]
        unit_id: i64,
    },
    /// List products, ordered by name.
    List(ListArgs),
    /// Show one product.
    Get { id: i64 },
    /// Update a product; omitted fields stay unchanged.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'c', long)]
        category_id: Option<i64>,
        #[arg(short = 'u', long)]
        unit_id: Option<i64>,
    },
    /// Delete a product (blocked while purchases reference it).
    Delete { id: i64 },
}

pub async fn run(pool: &DbPool, command: ProductCommand) -> Result<()> {
    match command {
        ProductCommand::Add {
            name,
            category_id,
            unit_id,
        } => {
            let id = db::add_product(pool, &name, category_id, unit_id).await?;
            print_record(&db::get_product(pool, id).await?);
        }
        ProductCommand::List(args) => {
            let products =
                db::list_products(pool, args.name.as_deref(), args.offset, args.limit).await?;
            print_records(&products, args.output.mode());
        }
        ProductCommand::Get { id } => {
            print_record(&db::get_product(pool, id).await?);
        }
        ProductCommand::Update {
            id,
            name,
            category_id,
            unit_id,
        } => {
            let updated = db::update_product(
                pool,
                id,
                &ProductUpdate {
                    name: name.as_deref(),
                    category_id,
                    unit_id,
                },
            )
            .await?;
            print_record(&updated);
        }
        ProductCommand::Delete { id } => {
            db::delete_product(pool, id).await?;
            println!("Deleted product {}", id);
        }
    }
    Ok(())
}
