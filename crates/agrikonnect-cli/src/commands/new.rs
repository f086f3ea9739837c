//! New migration command

use agrikonnect_core::config::MigrateConfig;
use agrikonnect_store::migrations::new_migration;
use clap::Args;

#[derive(Debug, Args)]
pub struct NewArgs {
    /// What the migration does, e.g. "add farmer products"
    #[arg(required = true, num_args = 1..)]
    pub description: Vec<String>,
}

pub fn execute(args: NewArgs, config: &MigrateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let description = args.description.join(" ");
    let path = new_migration(&config.migrations.directory, &description)?;

    println!("Created {}", path.display());
    Ok(())
}
