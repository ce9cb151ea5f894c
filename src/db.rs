//! Opens the application database and creates the tables for the domain models.

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use rusqlite::Connection;

use crate::{
    Error, account::create_account_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// The version of the schema created by [initialize].
///
/// Stored in SQLite's `user_version` pragma so that a database written by a
/// newer build is not silently misread.
pub const SCHEMA_VERSION: i64 = 1;

/// Where records are being persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageMode {
    /// Records are saved to the database file at `path`.
    Persistent {
        /// The path of the database file.
        path: PathBuf,
    },
    /// No database file was requested, records only live as long as the server.
    InMemory,
    /// A database file was requested but could not be used, records only live
    /// as long as the server.
    Degraded {
        /// Why the database file could not be used.
        reason: String,
    },
}

impl StorageMode {
    /// Whether records will be lost when the server stops.
    pub fn is_volatile(&self) -> bool {
        !matches!(self, StorageMode::Persistent { .. })
    }
}

impl Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Persistent { path } => write!(f, "persistent ({})", path.display()),
            StorageMode::InMemory => write!(f, "in-memory"),
            StorageMode::Degraded { reason } => write!(f, "degraded in-memory ({reason})"),
        }
    }
}

/// An initialized database connection and how it stores records.
#[derive(Debug)]
pub struct Storage {
    /// The initialized connection.
    pub connection: Connection,
    /// Whether the connection persists records.
    pub mode: StorageMode,
}

/// Open and initialize the database at `path`, or an in-memory database if
/// `path` is `None`.
///
/// If the file at `path` cannot be opened or initialized, the failure is
/// logged and an in-memory database is used instead with
/// [StorageMode::Degraded], so the app stays usable without persistence.
///
/// # Errors
/// Returns [Error::StorageUnavailable] if the in-memory database cannot be
/// opened either.
pub fn open_storage(path: Option<&Path>) -> Result<Storage, Error> {
    let mode = match path {
        Some(path) => match open_file(path) {
            Ok(connection) => {
                return Ok(Storage {
                    connection,
                    mode: StorageMode::Persistent {
                        path: path.to_owned(),
                    },
                });
            }
            Err(error) => {
                tracing::error!(
                    "Could not open the database at {}: {error}. Falling back to in-memory storage.",
                    path.display()
                );
                StorageMode::Degraded {
                    reason: error.to_string(),
                }
            }
        },
        None => StorageMode::InMemory,
    };

    let connection = Connection::open_in_memory()
        .map_err(|error| Error::StorageUnavailable(error.to_string()))?;
    initialize(&connection).map_err(|error| Error::StorageUnavailable(error.to_string()))?;

    Ok(Storage { connection, mode })
}

fn open_file(path: &Path) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    initialize(&connection)?;

    Ok(connection)
}

/// Create all the tables and indexes for the application and enable foreign
/// key checks on `connection`.
///
/// Safe to call on an already initialized database.
///
/// # Errors
/// Returns an error if the database was created by a newer schema version
/// or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let version: i64 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchemaVersion(version));
    }

    let transaction = connection.unchecked_transaction()?;
    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    transaction.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    transaction.commit()?;

    Ok(())
}
