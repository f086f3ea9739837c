//! Progress callbacks for a migrate run

use agrikonnect_core::errors::ExError;
use agrikonnect_core::model::report::AppliedMigration;
use agrikonnect_core::model::MigrationFile;

/// Observer notified as the runner works through the migration list.
///
/// All methods default to no-ops so implementors only override what they
/// need.
pub trait MigrationListener {
    /// `file` is already recorded in the ledger
    fn on_skipped(&mut self, _file: &MigrationFile) {}

    /// `file` is about to be applied
    fn on_applying(&mut self, _file: &MigrationFile) {}

    /// `file` committed
    fn on_applied(&mut self, _file: &MigrationFile, _applied: &AppliedMigration) {}

    /// `file` rolled back; the run stops after this call
    fn on_failed(&mut self, _file: &MigrationFile, _error: &ExError) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MigrationListener for NoopListener {}
