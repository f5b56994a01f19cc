use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::cli::output::{OutputFlags, print_record, print_records};
use crate::db::{self, DbPool, NewPurchase, PurchaseFilter, PurchaseUpdate};
use crate::errors::Result;

/// `purchase` subcommands.
#[derive(Debug, Subcommand)]
pub enum PurchaseCommand {
    /// Record a purchase.
    Add(AddArgs),
    /// List purchases, ordered by date (ID tie-break).
    List(PurchaseListArgs),
    /// Show one purchase.
    Get { id: i64 },
    /// Update a purchase; omitted fields stay unchanged.
    Update(UpdateArgs),
    /// Delete a purchase.
    Delete { id: i64 },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Purchase date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Product bought (ID).
    #[arg(short = 'p', long)]
    pub product_id: i64,

    /// Store bought at (ID).
    #[arg(short = 's', long)]
    pub store_id: i64,

    /// Quantity bought, in the product's unit.
    #[arg(short = 'q', long)]
    pub quantity: f64,

    /// Total receipt price for the quantity.
    #[arg(short = 't', long)]
    pub total_price: f64,

    /// Optional comment.
    #[arg(short = 'c', long)]
    pub comment: Option<String>,

    /// Promotional purchase; requires --regular-unit-price.
    #[arg(long)]
    pub promo: bool,

    /// Promo label ("discount", "multi_buy", ...); ignored without --promo.
    #[arg(long)]
    pub promo_type: Option<String>,

    /// Non-discounted unit price for comparison.
    #[arg(long)]
    pub regular_unit_price: Option<f64>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: i64,

    /// New purchase date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub product_id: Option<i64>,

    #[arg(long)]
    pub store_id: Option<i64>,

    #[arg(long)]
    pub quantity: Option<f64>,

    #[arg(long)]
    pub total_price: Option<f64>,

    #[arg(long)]
    pub comment: Option<String>,

    /// Mark the purchase as promotional.
    #[arg(long, conflicts_with = "no_promo")]
    pub promo: bool,

    /// Clear the promo flag and wipe the promo fields.
    #[arg(long)]
    pub no_promo: bool,

    #[arg(long)]
    pub promo_type: Option<String>,

    #[arg(long)]
    pub regular_unit_price: Option<f64>,
}

#[derive(Debug, Args)]
pub struct PurchaseListArgs {
    /// Restrict to one product (ID).
    #[arg(short = 'p', long)]
    pub product_id: Option<i64>,

    /// Restrict to one store (ID).
    #[arg(short = 's', long)]
    pub store_id: Option<i64>,

    /// Earliest date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub from_date: Option<NaiveDate>,

    /// Latest date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub to_date: Option<NaiveDate>,

    /// Only promotional purchases.
    #[arg(long, conflicts_with = "no_promo_only")]
    pub promo_only: bool,

    /// Only non-promotional purchases.
    #[arg(long)]
    pub no_promo_only: bool,

    /// Pagination offset.
    #[arg(short = 'o', long, default_value_t = 0)]
    pub offset: i64,

    /// Pagination limit; negative means no limit.
    #[arg(short = 'l', long, default_value_t = 100)]
    pub limit: i64,

    #[command(flatten)]
    pub output: OutputFlags,
}

impl PurchaseListArgs {
    fn promo_filter(&self) -> Option<bool> {
        if self.promo_only {
            Some(true)
        } else if self.no_promo_only {
            Some(false)
        } else {
            None
        }
    }
}

pub async fn run(pool: &DbPool, command: PurchaseCommand) -> Result<()> {
    match command {
        PurchaseCommand::Add(args) => {
            let id = db::add_purchase(
                pool,
                &NewPurchase {
                    purchase_date: args.date,
                    product_id: args.product_id,
                    store_id: args.store_id,
                    quantity: args.quantity,
                    total_price: args.total_price,
                    is_promo: args.promo,
                    promo_type: args.promo_type.as_deref(),
                    regular_unit_price: args.regular_unit_price,
                    comment: args.comment.as_deref(),
                },
            )
            .await?;
            print_record(&db::get_purchase(pool, id).await?);
        }
        PurchaseCommand::List(args) => {
            let filter = PurchaseFilter {
                product_id: args.product_id,
                store_id: args.store_id,
                from_date: args.from_date,
                to_date: args.to_date,
                promo: args.promo_filter(),
                offset: args.offset,
                limit: args.limit,
            };
            let purchases = db::list_purchases(pool, &filter).await?;
            print_records(&purchases, args.output.mode());
        }
        PurchaseCommand::Get { id } => {
            print_record(&db::get_purchase(pool, id).await?);
        }
        PurchaseCommand::Update(args) => {
            let promo = if args.promo {
                Some(true)
            } else if args.no_promo {
                Some(false)
            } else {
                None
            };
            let updated = db::update_purchase(
                pool,
                args.id,
                &PurchaseUpdate {
                    purchase_date: args.date,
                    product_id: args.product_id,
                    store_id: args.store_id,
                    quantity: args.quantity,
                    total_price: args.total_price,
                    promo,
                    promo_type: args.promo_type.as_deref(),
                    regular_unit_price: args.regular_unit_price,
                    comment: args.comment.as_deref(),
                },
            )
            .await?;
            print_record(&updated);
        }
        PurchaseCommand::Delete { id } => {
            db::delete_purchase(pool, id).await?;
            println!("Deleted purchase {}", id);
        }
    }
    Ok(())
}
