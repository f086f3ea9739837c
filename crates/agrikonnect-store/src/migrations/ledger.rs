//! Ledger of applied migrations
//!
//! One row per applied version. The `UNIQUE` constraint on `version` is the
//! last line of defence against two runners recording the same version.

use crate::errors::{duplicate_version, from_rusqlite, incompatible_ledger, schema_error, Result};
use agrikonnect_core::errors::{ExError, ExErrorKind};
use agrikonnect_core::model::migration::validate_table_name;
use agrikonnect_core::model::{LedgerEntry, MigrationFile, Version};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

pub const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// Columns the runner reads and writes
const REQUIRED_COLUMNS: [&str; 4] = ["version", "filename", "checksum", "executed_at"];

/// Handle on the ledger table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    table: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl Ledger {
    /// Ledger stored in `table`, which must be a plain identifier
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Schema`: `table` is not `[A-Za-z_][A-Za-z0-9_]*`
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table name as a quoted SQL identifier, so keywords such as `order` work
    fn ident(&self) -> String {
        format!("\"{}\"", self.table)
    }

    /// Create the ledger table if it does not exist, then check that an
    /// existing table has the columns the runner needs. Idempotent.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Schema`: the table cannot be created, or a table of
    ///   that name exists without the ledger columns
    pub fn ensure_schema(&self, conn: &Connection) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                checksum TEXT NOT NULL,
                executed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            self.ident()
        );
        conn.execute_batch(&sql)
            .map_err(|e| schema_error(&self.table, e))?;
        self.check_columns(conn)
    }

    /// Fail with `Schema` when the existing table lacks any ledger column
    fn check_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(from_rusqlite)?;
        let present = stmt
            .query_map([&self.table], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !present.iter().any(|p| p.eq_ignore_ascii_case(col)))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(incompatible_ledger(&self.table, &missing))
        }
    }

    /// Whether the ledger table has been created
    pub fn exists(&self, conn: &Connection) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [&self.table],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(from_rusqlite)
    }

    /// All applied versions keyed by version.
    ///
    /// A database without the ledger table has nothing applied; this never
    /// creates the table.
    pub fn list_applied(&self, conn: &Connection) -> Result<BTreeMap<Version, LedgerEntry>> {
        if !self.exists(conn)? {
            return Ok(BTreeMap::new());
        }
        self.check_columns(conn)?;

        let sql = format!(
            "SELECT version, filename, checksum, executed_at FROM {}",
            self.ident()
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut applied = BTreeMap::new();
        for (version, filename, checksum, executed_at) in rows {
            let version: Version = version.parse()?;
            let executed_at = parse_timestamp(&executed_at).ok_or_else(|| {
                ExError::new(ExErrorKind::Persistence)
                    .with_op("list_applied")
                    .with_version(version)
                    .with_message(format!("Unreadable executed_at '{}'", executed_at))
            })?;
            applied.insert(
                version,
                LedgerEntry {
                    version,
                    filename,
                    checksum,
                    executed_at,
                },
            );
        }

        Ok(applied)
    }

    /// Whether `version` has been recorded
    pub fn contains(&self, conn: &Connection, version: Version) -> Result<bool> {
        if !self.exists(conn)? {
            return Ok(false);
        }
        let sql = format!("SELECT 1 FROM {} WHERE version = ?1", self.ident());
        conn.query_row(&sql, [version.to_string()], |_| Ok(()))
            .optional()
            .map(|row| row.is_some())
            .map_err(from_rusqlite)
    }

    /// Record `file` as applied.
    ///
    /// Meant to run inside the transaction that executed the file's SQL.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::DuplicateVersion`: the version is already recorded
    /// - `ExErrorKind::Persistence`: any other database failure
    pub fn record(&self, conn: &Connection, file: &MigrationFile) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (version, filename, checksum) VALUES (?1, ?2, ?3)",
            self.ident()
        );
        conn.execute(
            &sql,
            params![file.version.to_string(), file.filename, file.checksum],
        )
        .map_err(|e| {
            if crate::errors::is_constraint_violation(&e) {
                duplicate_version(file, e)
            } else {
                from_rusqlite(e)
            }
        })?;
        Ok(())
    }
}

/// SQLite `CURRENT_TIMESTAMP` is `YYYY-MM-DD HH:MM:SS` in UTC; RFC 3339 is
/// accepted for rows written by other tools.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
