//! Filesystem locations the application writes to.
//!
//! Everything the application writes (the database file, logs) lives in a
//! per-user state directory, never next to the sources or the executable.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::errors::{Error, Result};

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "inflation-tracker", "InflationTracker").ok_or_else(|| {
        Error::Config("Could not determine a home directory for application state".to_string())
    })
}

/// Per-user state directory (`~/.local/share/inflationtracker` on Linux,
/// `%APPDATA%` based on Windows). Created on first use.
pub fn app_state_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    let path = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Directory for the append-only log files, under the state directory.
pub fn logs_dir() -> Result<PathBuf> {
    let path = app_state_dir()?.join("logs");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Default database file location, used when no explicit path is configured.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(app_state_dir()?.join("inflation.db"))
}
