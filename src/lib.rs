//! Inflation tracker - record purchases against small reference tables and
//! derive price trends over time.
//!
//! The crate is layered strictly one way: the CLI builds command values,
//! hands them to the data-access layer in [`db`], which talks to a single
//! embedded `SQLite` database whose schema is evolved by versioned migration
//! scripts at startup. There is no background work and no shared state beyond
//! the database file itself.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    unsafe_code,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    clippy::all,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::inefficient_to_string
)]

/// Command-line interface: argument parsing, dispatch and output rendering.
pub mod cli;

/// Application configuration: database path resolution and state directories.
pub mod config;

/// Data-access layer over the embedded `SQLite` database.
pub mod db;

/// Crate-wide error type and `Result` alias.
pub mod errors;

/// Plain row models shared by the data-access layer and the CLI.
pub mod models;

pub use errors::{Error, Result};
