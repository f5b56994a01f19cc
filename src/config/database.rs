//! Database location resolution.
//!
//! The path to the `SQLite` file is picked from the first available source:
//!
//! 1. the `--db-url` CLI flag,
//! 2. the `DB_URL` environment variable,
//! 3. a local `./inflation.db` file, if one exists (developer convenience),
//! 4. the default file in the per-user state directory.

use std::path::Path;

use tracing::{debug, instrument};

use crate::config::paths::default_db_path;
use crate::errors::Result;

/// Environment variable consulted when no `--db-url` flag is given.
pub const DB_URL_ENV_VAR: &str = "DB_URL";

/// Local database file picked up from the working directory when present.
pub const LOCAL_DB_FILE: &str = "inflation.db";

/// Resolved runtime configuration shared by every command.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the SQLite database file (or `:memory:`).
    pub database_path: String,
    /// Log SQL statements issued by the data-access layer.
    pub echo_sql: bool,
}

/// Resolves the database path from the sources listed in the module docs.
#[instrument]
pub fn resolve_database_path(override_path: Option<&str>) -> Result<String> {
    let env_value = std::env::var(DB_URL_ENV_VAR).ok();
    let local_exists = Path::new(LOCAL_DB_FILE).exists();
    let default = default_db_path()?;

    let resolved = pick_database_path(
        override_path,
        env_value.as_deref(),
        local_exists,
        &default.to_string_lossy(),
    );
    debug!("Resolved database path: {}", resolved);
    Ok(resolved)
}

// Pure selection logic, separated so the precedence order is testable without
// touching the process environment or the filesystem.
fn pick_database_path(
    override_path: Option<&str>,
    env_value: Option<&str>,
    local_exists: bool,
    default: &str,
) -> String {
    if let Some(path) = override_path {
        return path.to_string();
    }
    if let Some(url) = env_value {
        if !url.is_empty() {
            return url.to_string();
        }
    }
    if local_exists {
        return LOCAL_DB_FILE.to_string();
    }
    default.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_override_wins_over_everything() {
        let picked = pick_database_path(
            Some("/tmp/explicit.db"),
            Some("/tmp/env.db"),
            true,
            "/state/inflation.db",
        );
        assert_eq!(picked, "/tmp/explicit.db");
    }

    #[test]
    fn test_env_var_wins_over_local_file_and_default() {
        let picked = pick_database_path(None, Some("/tmp/env.db"), true, "/state/inflation.db");
        assert_eq!(picked, "/tmp/env.db");
    }

    #[test]
    fn test_empty_env_var_is_ignored() {
        let picked = pick_database_path(None, Some(""), false, "/state/inflation.db");
        assert_eq!(picked, "/state/inflation.db");
    }

    #[test]
    fn test_local_file_wins_over_default() {
        let picked = pick_database_path(None, None, true, "/state/inflation.db");
        assert_eq!(picked, LOCAL_DB_FILE);
    }

    #[test]
    fn test_default_used_as_last_resort() {
        let picked = pick_database_path(None, None, false, "/state/inflation.db");
        assert_eq!(picked, "/state/inflation.db");
    }
}
