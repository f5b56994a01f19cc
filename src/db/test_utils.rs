#![allow(dead_code)]
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params};
use tracing_subscriber::EnvFilter;

use crate::db::{DbPool, migrations};
use crate::errors::{Error, Result};

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer() // Crucial for `cargo test` output
        .try_init(); // Use try_init to avoid panic if already initialized
}

// Helper to create an in-memory DbPool for testing, with the full schema
// applied the same way `init_db` applies it.
pub(crate) async fn setup_test_db() -> Result<DbPool> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("Test DB: failed to open in-memory: {}", e)))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])
        .map_err(|e| Error::Database(format!("Test DB: failed to enable foreign keys: {}", e)))?;
    migrations::run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

// Direct-insert helpers for focused tests: bypass the validated add_* paths
// so a test exercises exactly one code path.

pub(crate) fn direct_insert_category(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO category (name, description) VALUES (?1, ?2)")?;
    Ok(stmt.insert(params![name, description])?)
}

pub(crate) fn direct_insert_unit(conn: &Connection, name: &str, measure_type: &str) -> Result<i64> {
    let mut stmt = conn.prepare_cached("INSERT INTO unit (name, measure_type) VALUES (?1, ?2)")?;
    Ok(stmt.insert(params![name, measure_type])?)
}

pub(crate) fn direct_insert_store(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<i64> {
    let mut stmt = conn.prepare_cached("INSERT INTO store (name, description) VALUES (?1, ?2)")?;
    Ok(stmt.insert(params![name, description])?)
}

pub(crate) fn direct_insert_product(
    conn: &Connection,
    name: &str,
    category_id: i64,
    unit_id: i64,
) -> Result<i64> {
    let mut stmt = conn
        .prepare_cached("INSERT INTO product (name, category_id, unit_id) VALUES (?1, ?2, ?3)")?;
    Ok(stmt.insert(params![name, category_id, unit_id])?)
}

/// IDs of a minimal reference-data fixture: one category, unit, store and
/// product wired together.
pub(crate) struct ReferenceFixture {
    pub(crate) category_id: i64,
    pub(crate) unit_id: i64,
    pub(crate) store_id: i64,
    pub(crate) product_id: i64,
}

pub(crate) fn seed_reference_fixture(pool: &DbPool) -> Result<ReferenceFixture> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let category_id = direct_insert_category(&conn, "Dairy", Some("Milk and friends"))?;
    let unit_id = direct_insert_unit(&conn, "l", "Volume")?;
    let store_id = direct_insert_store(&conn, "Corner Shop", None)?;
    let product_id = direct_insert_product(&conn, "Milk", category_id, unit_id)?;
    Ok(ReferenceFixture {
        category_id,
        unit_id,
        store_id,
        product_id,
    })
}
