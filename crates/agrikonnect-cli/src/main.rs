//! AgriKonnect CLI
//!
//! Command-line interface for the storefront schema migrations

use agrikonnect_core::config::MigrateConfig;
use agrikonnect_core::logging_facility;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "agrikonnect")]
#[command(about = "AgriKonnect - SQL schema migrations", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./agrikonnect.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Migration directory
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate(commands::migrate::MigrateArgs),
    /// Show applied and pending migrations
    Status(commands::status::StatusArgs),
    /// Check applied migrations against their recorded checksums
    Verify(commands::verify::VerifyArgs),
    /// Create the next migration file
    New(commands::new::NewArgs),
}

fn load_config(cli: &Cli) -> Result<MigrateConfig, Box<dyn std::error::Error>> {
    let mut config = MigrateConfig::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(dir) = &cli.dir {
        config.migrations.directory = dir.clone();
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        logging_facility::init(config.logging.profile);

        match cli.command {
            Commands::Migrate(args) => commands::migrate::execute(args, &config),
            Commands::Status(args) => commands::status::execute(args, &config),
            Commands::Verify(args) => commands::verify::execute(args, &config),
            Commands::New(args) => commands::new::execute(args, &config),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
