//! Migration domain model
//!
//! Value objects shared by discovery, the ledger and the runner.

pub mod migration;
pub mod report;
pub mod state;
pub mod version;

pub use migration::{
    filename_for, parse_filename, slugify, validate_table_name, LedgerEntry, MigrationFile,
    ParsedFilename,
};
pub use report::{AppliedMigration, MigrateReport, StatusReport, StatusRow};
pub use state::MigrationState;
pub use version::Version;
