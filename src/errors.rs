use thiserror::Error;

/// All failure modes of the application.
///
/// Everything except [`Error::Migration`] is recovered at the CLI boundary
/// and surfaced as a user-readable message plus a non-zero exit code. A
/// migration failure is fatal: no other component may touch a database whose
/// schema is not current.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} named '{name}' already exists")]
    DuplicateName { entity: &'static str, name: String },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} with ID {id} does not exist")]
    InvalidReference { entity: &'static str, id: i64 },

    #[error("Cannot delete {entity} with ID {id}: {count} dependent {dependents} exist")]
    ReferencedEntity {
        entity: &'static str,
        id: i64,
        dependents: &'static str,
        count: i64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
