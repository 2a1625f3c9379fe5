#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot persistence for occupancy aggregates.
//!
//! [`snapshot::Snapshot`] lays an aggregate out as three rows over a
//! dynamic column set. [`store::SwitchyStore`] replaces the contents of the
//! snapshot table with those rows inside one transaction, on Postgres or
//! `SQLite` through `switchy_database`.

pub mod db;
pub mod snapshot;
pub mod store;

pub use snapshot::{AreaColumn, ColumnLimits, Reference, Snapshot};
pub use store::{SnapshotSink, SwitchyStore};

/// Step of a snapshot replacement that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum WriteStage {
    /// Opening the transaction.
    Begin,
    /// Clearing the previous snapshot.
    Delete,
    /// Writing the new rows.
    Insert,
    /// Committing the transaction.
    Commit,
}

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// A snapshot replacement failed and was rolled back.
    #[error("Failed to {stage} snapshot in {table}: {source}")]
    Persistence {
        /// Step that failed.
        stage: WriteStage,
        /// Target table.
        table: String,
        /// Underlying database error.
        #[source]
        source: switchy_database::DatabaseError,
    },

    /// The sink could not be opened.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// The configured table name is not a plain SQL identifier.
    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),
}
