//! Run and status reports

use crate::model::{LedgerEntry, MigrationState, Version};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A migration committed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: Version,
    pub filename: String,
    /// Number of SQL statements executed
    pub statements: usize,
    pub duration_ms: u64,
}

/// Outcome of a successful `migrate` run.
///
/// A failed run is reported through the error instead; migrations committed
/// before the failure stay in the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    pub applied: Vec<AppliedMigration>,
    /// Versions that were already executed
    pub skipped: Vec<Version>,
    /// Pending versions above the requested target
    pub held_back: Vec<Version>,
    /// Pending versions a dry run would apply
    pub pending: Vec<Version>,
    pub dry_run: bool,
}

impl MigrateReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// True when nothing was (or would be) applied
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty() && self.pending.is_empty()
    }
}

/// One discovered file paired with its ledger state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub version: Version,
    pub filename: String,
    pub description: String,
    /// `Pending` or `Applied`
    pub state: MigrationState,
    pub executed_at: Option<DateTime<Utc>>,
    /// Applied, but the file no longer matches the recorded checksum
    pub modified: bool,
}

impl StatusRow {
    pub fn is_executed(&self) -> bool {
        self.state == MigrationState::Applied
    }
}

/// Read-only view of discovered migrations against the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Ordered by version ascending
    pub rows: Vec<StatusRow>,
    /// Ledger entries with no file on disk
    pub orphaned: Vec<LedgerEntry>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &StatusRow> {
        self.rows.iter().filter(|r| !r.is_executed())
    }

    pub fn applied_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_executed()).count()
    }

    pub fn modified(&self) -> impl Iterator<Item = &StatusRow> {
        self.rows.iter().filter(|r| r.modified)
    }
}
