//! CLI command implementations

pub mod migrate;
pub mod new;
pub mod status;
pub mod verify;

use agrikonnect_core::config::MigrateConfig;
use agrikonnect_core::core_types::RequestContext;
use agrikonnect_store::{db, Migrator};
use rusqlite::Connection;
use std::time::Duration;

fn busy_timeout(config: &MigrateConfig) -> Duration {
    Duration::from_millis(config.database.busy_timeout_ms)
}

/// Open the configured database for writing
pub(crate) fn open_for_migrate(config: &MigrateConfig) -> agrikonnect_store::Result<Connection> {
    let conn = db::open(&config.database.path)?;
    db::configure(&conn, busy_timeout(config))?;
    Ok(conn)
}

/// Open the configured database without creating or changing it
pub(crate) fn open_for_read(config: &MigrateConfig) -> agrikonnect_store::Result<Connection> {
    db::open_read_only(&config.database.path, busy_timeout(config))
}

/// Runner for the configured directory and ledger, tagged as a CLI run
pub(crate) fn migrator(config: &MigrateConfig) -> agrikonnect_store::Result<Migrator> {
    Ok(Migrator::from_config(config)?.with_context(RequestContext::new().with_actor("cli")))
}
