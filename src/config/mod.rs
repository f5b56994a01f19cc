/// Database path resolution and runtime configuration
pub mod database;

/// User state directory and log file locations
pub mod paths;

pub use database::{AppConfig, DB_URL_ENV_VAR, LOCAL_DB_FILE, resolve_database_path};
pub use paths::{app_state_dir, default_db_path, logs_dir};
