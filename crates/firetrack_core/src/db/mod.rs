//! Document database: connection setup, versioned storage and seed data.
//!
//! Nothing above this module touches SQLite before [`open_db`] or
//! [`open_db_in_memory`] has returned, which guarantees the storage is at
//! [`migrations::latest_version`].

use std::error::Error;
use std::fmt::{self, Display, Formatter};

pub mod migrations;
mod open;
pub mod seed;

pub use open::{open_db, open_db_in_memory};
pub use seed::{seed_core_documents, seed_core_schema};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening, upgrading or seeding the database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build; it is left untouched.
    NewerSchema { found: u32, supported: u32 },
    /// A migration step failed and was rolled back.
    Migration {
        version: u32,
        label: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::NewerSchema { found, supported } => write!(
                f,
                "storage version {found} is ahead of this build (up to {supported})"
            ),
            Self::Migration {
                version,
                label,
                source,
            } => write!(f, "migration {version} ({label}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::NewerSchema { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
