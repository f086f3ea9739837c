//! Migration framework
//!
//! Provides:
//! - Discovery of `V<digits>__<description>.sql` files
//! - The ledger of applied versions with checksums
//! - A runner applying pending versions in order, one transaction each
//! - Scaffolding for new migration files

mod checksums;
mod discovery;
mod ledger;
mod listener;
mod runner;
mod scaffold;

pub use checksums::compute_checksum;
pub use discovery::list_migrations;
pub use ledger::{Ledger, DEFAULT_LEDGER_TABLE};
pub use listener::{MigrationListener, NoopListener};
pub use runner::{apply_migrations, MigrateOptions, Migrator};
pub use scaffold::new_migration;
