//! Migration file discovery
//!
//! Every visible `.sql` file in the directory must be a well-formed
//! migration; one bad name rejects the whole listing rather than silently
//! dropping a migration. Other files and subdirectories are ignored.

use crate::errors::{discovery_error, unreadable_file, Result};
use crate::migrations::checksums::compute_checksum;
use agrikonnect_core::errors::MigrationModelError;
use agrikonnect_core::model::migration::is_migration_candidate;
use agrikonnect_core::model::MigrationFile;
use std::fs;
use std::path::Path;

/// List all migrations in `directory`, sorted by version ascending.
///
/// The directory is read fresh on every call.
///
/// ## Errors
///
/// - `ExErrorKind::Discovery`: directory missing, not a directory, or a file is unreadable
/// - `ExErrorKind::InvalidFilename`: a `.sql` file does not match `V<digits>__<description>.sql`
/// - `ExErrorKind::DuplicateVersion`: two files resolve to the same version
pub fn list_migrations(directory: &Path) -> Result<Vec<MigrationFile>> {
    let entries = fs::read_dir(directory).map_err(|e| discovery_error(directory, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| discovery_error(directory, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                let lossy = raw.to_string_lossy().into_owned();
                if is_migration_candidate(&lossy) {
                    return Err(MigrationModelError::InvalidFilename {
                        filename: lossy,
                        reason: "file name is not valid UTF-8".to_string(),
                    }
                    .into());
                }
                continue;
            }
        };

        if !is_migration_candidate(&name) {
            tracing::debug!(file = %name, "Ignoring non-migration file");
            continue;
        }

        let sql = fs::read_to_string(&path).map_err(|e| unreadable_file(&path, e))?;
        let checksum = compute_checksum(&sql);
        files.push(MigrationFile::new(name, sql, checksum)?);
    }

    files.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    if let Some(pair) = files.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(MigrationModelError::DuplicateVersion {
            version: pair[0].version.to_string(),
            first: pair[0].filename.clone(),
            second: pair[1].filename.clone(),
        }
        .into());
    }

    tracing::debug!(
        directory = %directory.display(),
        count = files.len(),
        "Discovered migrations"
    );

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrikonnect_core::errors::ExErrorKind;
    use agrikonnect_core::model::Version;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "V10__ten.sql", "SELECT 10;");
        write(dir.path(), "V2__two.sql", "SELECT 2;");
        write(dir.path(), "V1__one.sql", "SELECT 1;");

        let files = list_migrations(dir.path()).unwrap();
        let versions: Vec<u64> = files.iter().map(|f| f.version.get()).collect();
        assert_eq!(versions, vec![1, 2, 10]);
        assert_eq!(files[0].sql, "SELECT 1;");
        assert_eq!(files[0].checksum, compute_checksum("SELECT 1;"));
    }

    #[test]
    fn test_ignores_non_sql_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "V1__one.sql", "SELECT 1;");
        write(dir.path(), "README.md", "docs");
        write(dir.path(), ".gitkeep", "");
        fs::create_dir(dir.path().join("archive.sql")).unwrap();

        let files = list_migrations(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].version, Version::new(1));
    }

    #[test]
    fn test_invalid_filename_rejects_listing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "V1__one.sql", "SELECT 1;");
        write(dir.path(), "create_orders.sql", "SELECT 2;");

        let err = list_migrations(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidFilename);
        assert_eq!(err.filename(), Some("create_orders.sql"));
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "V1__one.sql", "SELECT 1;");
        write(dir.path(), "V001__also_one.sql", "SELECT 1;");

        let err = list_migrations(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DuplicateVersion);
        assert_eq!(err.version(), Some("1"));
    }

    #[test]
    fn test_missing_directory_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_migrations(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Discovery);
    }

    #[test]
    fn test_file_instead_of_directory_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "V1__one.sql", "SELECT 1;");
        let err = list_migrations(&dir.path().join("V1__one.sql")).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Discovery);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_migrations(dir.path()).unwrap().is_empty());
    }
}
