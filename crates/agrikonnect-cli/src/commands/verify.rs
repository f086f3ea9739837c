//! Verify command

use agrikonnect_core::config::MigrateConfig;
use clap::Args;

#[derive(Debug, Args)]
pub struct VerifyArgs {}

pub fn execute(_args: VerifyArgs, config: &MigrateConfig) -> Result<(), Box<dyn std::error::Error>> {
    let migrator = super::migrator(config)?;
    let conn = super::open_for_read(config)?;
    let verified = migrator.verify(&conn)?;

    println!("Verified {} applied migration(s).", verified);
    Ok(())
}
