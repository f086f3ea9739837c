//! New migration file scaffolding

use crate::errors::{io_error, Result};
use crate::migrations::discovery::list_migrations;
use agrikonnect_core::errors::{ExError, ExErrorKind};
use agrikonnect_core::model::migration::{filename_for, slugify};
use agrikonnect_core::model::Version;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Create `V<next>__<slug>.sql` in `directory` and return its path.
///
/// `<next>` is one more than the highest version on disk (1 for an empty or
/// missing directory). The directory is created if needed.
///
/// ## Errors
///
/// - `ExErrorKind::InvalidInput`: `description` has no alphanumeric characters
/// - `ExErrorKind::AlreadyExists`: the file already exists
/// - `ExErrorKind::InvalidFilename` / `DuplicateVersion`: the directory holds bad files
pub fn new_migration(directory: &Path, description: &str) -> Result<PathBuf> {
    let slug = slugify(description)?;

    fs::create_dir_all(directory).map_err(|e| io_error("new_migration", e))?;
    let existing = list_migrations(directory)?;

    let next = match existing.last() {
        Some(latest) => latest.version.next().ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("new_migration")
                .with_version(latest.version)
                .with_message("No version follows the latest migration")
        })?,
        None => Version::new(1),
    };

    let filename = filename_for(next, &slug);
    let path = directory.join(&filename);

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| io_error("new_migration", e).with_filename(filename.clone()))?;
    writeln!(file, "-- {}", description.trim())
        .map_err(|e| io_error("new_migration", e).with_filename(filename.clone()))?;

    tracing::info!(version = next.get(), file = %path.display(), "Created migration");

    Ok(path)
}
