use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{debug, info, instrument};

use crate::db::migrations::run_migrations;
use crate::errors::{Error, Result};

/// Shared handle to the single database connection. The application is
/// single-user and synchronous, so one connection behind a mutex is enough;
/// exclusive writer access comes from SQLite's own file locking.
pub type DbPool = Arc<Mutex<Connection>>;

/// Opens the database at `db_path` and brings its schema up to date.
///
/// Foreign-key enforcement is switched on for the connection's lifetime, and
/// all pending migrations are applied before the pool is handed out: no CRUD
/// operation ever sees a stale schema.
///
/// # Errors
///
/// Returns `Error::Database` if the file cannot be opened and
/// `Error::Migration` (fatal) if a pending migration fails to apply.
#[instrument]
pub async fn init_db(db_path: &str) -> Result<DbPool> {
    debug!("Initializing database connection to: {}", db_path);
    let conn = Connection::open(db_path)
        .map_err(|e| Error::Database(format!("Failed to open database at {}: {}", db_path, e)))?;

    conn.execute("PRAGMA foreign_keys = ON;", [])
        .map_err(|e| Error::Database(format!("Failed to enable foreign keys: {}", e)))?;

    info!("Database connection opened. Applying pending migrations...");
    run_migrations(&conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}
