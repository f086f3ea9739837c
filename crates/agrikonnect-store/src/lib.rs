//! AgriKonnect Store - SQLite persistence for schema migrations
//!
//! Provides:
//! - Connection helpers for the storefront database
//! - Discovery of versioned `V<digits>__<description>.sql` files
//! - The migration ledger table
//! - The migration runner (`migrate`, `status`, `verify`) and scaffolding

pub mod db;
pub mod errors;
pub mod migrations;

// Re-export key types
pub use errors::Result;
pub use migrations::{apply_migrations, MigrateOptions, Migrator};
