use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};

use crate::cli::output::{OutputFlags, print_records};
use crate::cli::plot;
use crate::db::{self, DbPool, PriceMode, PromoMode};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriceModeArg {
    /// Unit price actually paid (total price / quantity).
    Paid,
    /// Non-discounted comparison price on promo purchases.
    Regular,
}

impl From<PriceModeArg> for PriceMode {
    fn from(arg: PriceModeArg) -> Self {
        match arg {
            PriceModeArg::Paid => PriceMode::Paid,
            PriceModeArg::Regular => PriceMode::Regular,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromoModeArg {
    Include,
    Exclude,
    Only,
}

impl From<PromoModeArg> for PromoMode {
    fn from(arg: PromoModeArg) -> Self {
        match arg {
            PromoModeArg::Include => PromoMode::Include,
            PromoModeArg::Exclude => PromoMode::Exclude,
            PromoModeArg::Only => PromoMode::Only,
        }
    }
}

/// `trend`: the time-ordered unit price of one product, as a listing or an
/// SVG line chart.
#[derive(Debug, Args)]
pub struct TrendArgs {
    /// Product to chart (ID).
    #[arg(short = 'p', long)]
    pub product_id: i64,

    /// Restrict to purchases at one store (ID).
    #[arg(short = 's', long)]
    pub store_id: Option<i64>,

    /// Earliest date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub from_date: Option<NaiveDate>,

    /// Latest date to include (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub to_date: Option<NaiveDate>,

    /// Which unit price each point carries.
    #[arg(long, value_enum, default_value_t = PriceModeArg::Paid)]
    pub price_mode: PriceModeArg,

    /// How promo purchases participate.
    #[arg(long = "promo", value_enum, default_value_t = PromoModeArg::Include)]
    pub promo: PromoModeArg,

    /// Also write an SVG line chart to this path.
    #[arg(long)]
    pub svg: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputFlags,
}

pub async fn run(pool: &DbPool, args: TrendArgs) -> Result<()> {
    let points = db::price_trend(
        pool,
        args.product_id,
        args.store_id,
        args.from_date,
        args.to_date,
        args.price_mode.into(),
        args.promo.into(),
    )
    .await?;

    if let Some(path) = &args.svg {
        plot::render_svg(&points, path)?;
        println!("Wrote chart to {}", path.display());
    }
    print_records(&points, args.output.mode());
    Ok(())
}
