//! Migrate command

use agrikonnect_core::config::MigrateConfig;
use agrikonnect_core::errors::ExError;
use agrikonnect_core::model::report::AppliedMigration;
use agrikonnect_core::model::{MigrationFile, Version};
use agrikonnect_store::migrations::MigrationListener;
use agrikonnect_store::MigrateOptions;
use clap::Args;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// List pending migrations without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Apply up to and including this version (e.g. `12` or `V12`)
    #[arg(long)]
    pub target: Option<Version>,
}

/// Prints one line per migration as the run progresses
struct ConsoleListener;

impl MigrationListener for ConsoleListener {
    fn on_skipped(&mut self, file: &MigrationFile) {
        println!("Migration {} already executed.", file.version);
    }

    fn on_applying(&mut self, file: &MigrationFile) {
        println!("Migrating: {}", file.filename);
    }

    fn on_applied(&mut self, file: &MigrationFile, applied: &AppliedMigration) {
        println!("Migrated:  {} ({} ms)", file.filename, applied.duration_ms);
    }

    fn on_failed(&mut self, file: &MigrationFile, _error: &ExError) {
        println!("Failed:    {}", file.filename);
    }
}

pub fn execute(args: MigrateArgs, config: &MigrateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let migrator = super::migrator(config)?;
    let options = MigrateOptions {
        dry_run: args.dry_run,
        target: args.target,
    };

    let mut conn = if options.dry_run {
        super::open_for_read(config)?
    } else {
        super::open_for_migrate(config)?
    };

    let report = migrator.migrate_with(&mut conn, &options, &mut ConsoleListener)?;

    for version in &report.pending {
        println!("Pending:   migration {}", version);
    }
    if let Some(target) = options.target {
        for version in &report.held_back {
            println!("Held back: migration {} (target {})", version, target);
        }
    }

    if report.is_up_to_date() {
        println!("Nothing to migrate.");
    } else if report.dry_run {
        println!("{} migration(s) pending.", report.pending.len());
    } else {
        println!("Applied {} migration(s).", report.applied_count());
    }

    Ok(())
}
