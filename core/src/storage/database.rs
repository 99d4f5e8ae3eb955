//! SQLite file behind the slot store.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type Connection = rusqlite::Connection;

/// Highest schema version this build can read
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = include_str!("../../schema.sql");

/// Location of the local poimap database
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open the database, creating the file and its directory on first use.
    /// The schema is applied on every open; a file written by a newer
    /// schema is refused.
    pub fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(SCHEMA)?;

        let version = schema_version(&conn)?;
        if version > SCHEMA_VERSION {
            return Err(Error::Storage(format!(
                "{} uses schema version {}, newer than supported version {}",
                self.db_path.display(),
                version,
                SCHEMA_VERSION
            )));
        }

        debug!(path = %self.db_path.display(), version, "database opened");
        Ok(conn)
    }
}

fn schema_version(conn: &Connection) -> Result<i32> {
    let version: String = conn.query_row(
        "SELECT value FROM metadata WHERE key = 'schema_version'",
        [],
        |row| row.get(0),
    )?;

    version
        .parse::<i32>()
        .map_err(|_| Error::InvalidInput(format!("Invalid schema version: {}", version)))
}
