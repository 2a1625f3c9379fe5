//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::Credentials;

use crate::DbError;

/// DSN that opens a private in-memory `SQLite` database.
pub const SQLITE_MEMORY: &str = "sqlite::memory:";

const SQLITE_PREFIX: &str = "sqlite://";

/// Opens the sink named by `dsn`.
///
/// Accepted forms are `postgres://…` (or `postgresql://…`),
/// `sqlite://<path>`, and [`SQLITE_MEMORY`]. Postgres connections get a
/// 30-second `statement_timeout` so a stalled write fails the cycle instead
/// of hanging it.
///
/// # Errors
///
/// Returns [`DbError::Connection`] if the DSN is not recognized or the
/// connection cannot be established.
pub async fn connect(dsn: &str) -> Result<Box<dyn Database>, DbError> {
    if dsn == SQLITE_MEMORY {
        log::debug!("Opening in-memory SQLite sink");
        return switchy_database_connection::init_sqlite_rusqlite(None).map_err(connection_error);
    }

    if let Some(path) = dsn.strip_prefix(SQLITE_PREFIX) {
        let path = Path::new(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(connection_error)?;
        }
        log::debug!("Opening SQLite sink at {}", path.display());
        return switchy_database_connection::init_sqlite_rusqlite(Some(path))
            .map_err(connection_error);
    }

    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        // Query parameters (e.g. ?sslmode=require) are not understood by the
        // credentials parser. TLS is negotiated by the connector.
        let url_base = dsn.split('?').next().unwrap_or(dsn);

        let creds = Credentials::from_url(url_base).map_err(connection_error)?;
        let db = switchy_database_connection::init_postgres_raw_native_tls(creds)
            .await
            .map_err(connection_error)?;

        db.exec_raw("SET statement_timeout = '30s'").await?;

        log::debug!("Connected to Postgres sink");
        return Ok(db);
    }

    Err(DbError::Connection {
        message: format!("Unsupported DSN scheme: {}", redact(dsn)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn connection_error(e: impl std::fmt::Display) -> DbError {
    DbError::Connection {
        message: e.to_string(),
    }
}

/// Drops everything after the scheme so credentials never reach the logs.
fn redact(dsn: &str) -> &str {
    dsn.split_once("://").map_or("<unknown>", |(scheme, _)| scheme)
}
