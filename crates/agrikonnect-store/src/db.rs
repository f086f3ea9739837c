//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, io_error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path, creating parent directories
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("open_database", e))?;
    }
    Connection::open(path).map_err(from_rusqlite)
}

/// Open a database for inspection only.
///
/// A missing file is not created; an empty in-memory database stands in for
/// it, so callers see nothing applied.
pub fn open_read_only<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();
    let conn = if path.exists() {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(from_rusqlite)?
    } else {
        open_in_memory()?
    };
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;
    Ok(conn)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for migration runs
///
/// A non-zero busy timeout makes a second runner wait for the first one's
/// write lock instead of failing with `SQLITE_BUSY`.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;

    // Set WAL mode for better concurrency
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(from_rusqlite)?;

    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    Ok(())
}
