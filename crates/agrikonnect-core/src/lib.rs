//! AgriKonnect Core - shared facilities for the schema migration tooling
//!
//! This crate provides:
//! - The canonical error facility (`ExError`, `ExErrorKind`)
//! - The structured logging facility and its operation macros
//! - Layered runner configuration
//! - The migration domain model (`Version`, `MigrationFile`, `LedgerEntry`,
//!   lifecycle state and reports)

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;

// Macros expand to `$crate::core_types::...`
pub use agrikonnect_core_types as core_types;

// Re-export commonly used types
pub use config::{ChecksumPolicy, MigrateConfig};
pub use errors::{ExError, ExErrorKind, MigrationModelError, Result};
pub use model::{LedgerEntry, MigrationFile, MigrationState, Version};
