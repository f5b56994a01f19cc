use clap::Subcommand;

use crate::cli::ListArgs;
use crate::cli::output::{print_record, print_records};
use crate::db::{self, DbPool};
use crate::errors::Result;

/// `units` subcommands.
#[derive(Debug, Subcommand)]
pub enum UnitCommand {
    /// Add a new measurement unit.
    Add {
        /// Unique unit symbol ("kg", "l", "pcs").
        name: String,
        /// What the unit measures ("Weight", "Volume", ...).
        measure_type: String,
    },
    /// List units, ordered by name.
    List(ListArgs),
    /// Show one unit.
    Get { id: i64 },
    /// Update a unit; omitted fields stay unchanged.
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'm', long)]
        measure_type: Option<String>,
    },
    /// Delete a unit (blocked while products reference it).
    Delete { id: i64 },
}

pub async fn run(pool: &DbPool, command: UnitCommand) -> Result<()> {
    match command {
        UnitCommand::Add { name, measure_type } => {
            let id = db::add_unit(pool, &name, &measure_type).await?;
            print_record(&db::get_unit(pool, id).await?);
        }
        UnitCommand::List(args) => {
            let units = db::list_units(pool, args.name.as_deref(), args.offset, args.limit).await?;
            print_records(&units, args.output.mode());
        }
        UnitCommand::Get { id } => {
            print_record(&db::get_unit(pool, id).await?);
        }
        UnitCommand::Update {
            id,
            name,
            measure_type,
        } => {
            let updated = db::update_unit(pool, id, name.as_deref(), measure_type.as_deref()).await?;
            print_record(&updated);
        }
        UnitCommand::Delete { id } => {
            db::delete_unit(pool, id).await?;
            println!("Deleted unit {}", id);
        }
    }
    Ok(())
}
