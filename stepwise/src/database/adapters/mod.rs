//! Store adapters: MySQL legacy source, PostgreSQL target, in-memory doubles

pub mod memory;
pub mod mysql;
pub mod postgres;

pub use memory::{MemoryRepository, MemorySource};
pub use mysql::MySqlSource;
pub use postgres::{connect_pool, PostgresRepository};

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted
pub fn validate_identifier(name: &str) -> Result<&str> {
    let valid = IDENTIFIER
        .as_ref()
        .map(|re| re.is_match(name))
        .unwrap_or(false);
    if valid {
        Ok(name)
    } else {
        Err(Error::config(format!("'{}' is not a valid SQL identifier", name)))
    }
}

/// SQLSTATE of a driver error, when the server reported one
pub(crate) fn sql_state(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Errors that mean the store itself is out of reach rather than a bad query
pub(crate) fn connection_error(error: &sqlx::Error, store: &str) -> Option<Error> {
    match error {
        sqlx::Error::PoolTimedOut => Some(Error::timeout(format!(
            "timed out acquiring a {} connection",
            store
        ))),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => Some(Error::database_connection(format!(
            "{} connection failed: {}",
            store, error
        ))),
        _ => None,
    }
}
