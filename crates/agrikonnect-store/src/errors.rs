//! Error handling for agrikonnect-store
//!
//! Builds canonical [`ExError`]s with store-specific context.

use agrikonnect_core::core_types::schema::{OP_APPLY_MIGRATION, OP_DISCOVER};
use agrikonnect_core::errors::{ExError, ExErrorKind};
use agrikonnect_core::model::MigrationFile;
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Migration directory is missing or unreadable
pub fn discovery_error(directory: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Discovery)
        .with_op(OP_DISCOVER)
        .with_message(format!(
            "Cannot read migration directory {}: {}",
            directory.display(),
            err
        ))
}

/// A migration file was found but could not be read
pub fn unreadable_file(path: &Path, err: std::io::Error) -> ExError {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ExError::new(ExErrorKind::Discovery)
        .with_op(OP_DISCOVER)
        .with_filename(filename)
        .with_message(format!("Cannot read {}: {}", path.display(), err))
}

/// Ledger table could not be created
pub fn schema_error(table: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Schema)
        .with_op("ensure_ledger_schema")
        .with_message(format!("Cannot create ledger table '{}': {}", table, err))
}

/// A table with the ledger's name exists but cannot serve as the ledger
pub fn incompatible_ledger(table: &str, missing: &[&str]) -> ExError {
    ExError::new(ExErrorKind::Schema)
        .with_op("ensure_ledger_schema")
        .with_message(format!(
            "Table '{}' exists but is not a compatible migration ledger; missing columns: {}",
            table,
            missing.join(", ")
        ))
}

/// Wrap the cause of a failed apply; the transaction has been rolled back
pub fn migration_failed(file: &MigrationFile, cause: ExError) -> ExError {
    let mut err = ExError::new(ExErrorKind::MigrationFailed)
        .with_op(OP_APPLY_MIGRATION)
        .with_version(file.version)
        .with_filename(file.filename.clone())
        .with_message(format!(
            "Migration {} failed and was rolled back: {}",
            file.version,
            cause.message()
        ));
    if let Some(ordinal) = cause.statement() {
        err = err.with_statement(ordinal);
    }
    err.with_source(cause)
}

/// A statement inside a migration body failed to prepare or execute
pub fn statement_error(ordinal: usize, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("execute_statement")
        .with_statement(ordinal)
        .with_message(err.to_string())
}

/// Applied file content differs from the checksum recorded in the ledger
pub fn checksum_mismatch(file: &MigrationFile, recorded: &str) -> ExError {
    ExError::new(ExErrorKind::ChecksumMismatch)
        .with_op("verify_checksum")
        .with_version(file.version)
        .with_filename(file.filename.clone())
        .with_message(format!(
            "Checksum mismatch for migration {}: ledger has {}, file has {}",
            file.version, recorded, file.checksum
        ))
}

/// Ledger insert hit the unique constraint on `version`
pub fn duplicate_version(file: &MigrationFile, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::DuplicateVersion)
        .with_op("record_migration")
        .with_version(file.version)
        .with_filename(file.filename.clone())
        .with_message(format!("Version already recorded in ledger: {}", err))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    let kind = match err.kind() {
        std::io::ErrorKind::AlreadyExists => ExErrorKind::AlreadyExists,
        _ => ExErrorKind::Io,
    };
    ExError::new(kind)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Whether a rusqlite error is a constraint violation (e.g. UNIQUE)
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
