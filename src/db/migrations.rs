//! Versioned schema migrations, gated on `PRAGMA user_version`.
//!
//! Each entry in [`MIGRATIONS`] moves the schema from version N to N+1 and is
//! applied inside a single transaction together with the version bump. The
//! list is append-only: existing entries are never edited, new ones are added
//! at the end.

use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::errors::{Error, Result};

/// Version 1: the four reference tables.
///
/// Name uniqueness is case-insensitive by policy, enforced with
/// `COLLATE NOCASE` unique columns.
const V1_REFERENCE_TABLES: &str = "
    CREATE TABLE category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        description TEXT
    );

    CREATE TABLE unit (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        measure_type TEXT NOT NULL
    );

    CREATE TABLE store (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        description TEXT
    );

    CREATE TABLE product (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        category_id INTEGER NOT NULL,
        unit_id INTEGER NOT NULL,
        FOREIGN KEY (category_id) REFERENCES category (id),
        FOREIGN KEY (unit_id) REFERENCES unit (id)
    );
";

/// Version 2: the purchase fact table. Dates are ISO-8601 TEXT, so lexical
/// comparison matches calendar order for range filters.
const V2_PURCHASE_TABLE: &str = "
    CREATE TABLE purchase (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_date DATE NOT NULL,
        product_id INTEGER NOT NULL,
        store_id INTEGER NOT NULL,
        quantity REAL NOT NULL,
        total_price REAL NOT NULL,
        comment TEXT,
        FOREIGN KEY (product_id) REFERENCES product (id),
        FOREIGN KEY (store_id) REFERENCES store (id)
    );

    CREATE INDEX idx_purchase_product ON purchase (product_id);
    CREATE INDEX idx_purchase_store ON purchase (store_id);
    CREATE INDEX idx_purchase_date ON purchase (purchase_date);
";

/// Version 3: promo tracking columns on purchase.
const V3_PROMO_COLUMNS: &str = "
    ALTER TABLE purchase ADD COLUMN is_promo BOOLEAN NOT NULL DEFAULT FALSE;
    ALTER TABLE purchase ADD COLUMN promo_type TEXT;
    ALTER TABLE purchase ADD COLUMN regular_unit_price REAL;
";

const MIGRATIONS: &[&str] = &[V1_REFERENCE_TABLES, V2_PURCHASE_TABLE, V3_PROMO_COLUMNS];

/// Current schema version of the database behind `conn`.
pub fn schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| Error::Migration(format!("Failed to read schema version: {}", e)))
}

/// Applies every pending migration, in order, bumping `user_version` with
/// each one. Safe to call repeatedly; a database that is already current is
/// left untouched.
///
/// # Errors
///
/// Returns `Error::Migration` if the stored version is newer than this binary
/// supports or if any migration script fails. Callers must treat this as
/// fatal: every other component assumes the schema is current.
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;
    let target = MIGRATIONS.len() as i64;

    if current > target {
        return Err(Error::Migration(format!(
            "Database schema version {} is newer than the latest known version {}",
            current, target
        )));
    }
    if current == target {
        debug!("Schema is current at version {}", current);
        return Ok(());
    }

    for (idx, script) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = idx as i64 + 1;
        info!("Applying schema migration {} of {}", version, target);
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            script, version
        ))
        .map_err(|e| Error::Migration(format!("Migration {} failed to apply: {}", version, e)))?;
    }

    info!("Database schema is up to date at version {}", target);
    Ok(())
}
