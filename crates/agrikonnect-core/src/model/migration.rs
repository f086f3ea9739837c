//! Migration files and ledger entries

use crate::errors::MigrationModelError;
use crate::model::Version;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const VERSION_PREFIX: char = 'V';
pub const DESCRIPTION_SEPARATOR: &str = "__";
pub const MIGRATION_EXTENSION: &str = ".sql";

/// Whether a directory entry name must be treated as a migration file.
///
/// Every visible `.sql` file is a candidate and must then parse; anything else
/// (READMEs, `.gitkeep`, editor swap files) is ignored.
pub fn is_migration_candidate(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(MIGRATION_EXTENSION)
}

/// Components of a `V<digits>__<description>.sql` file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub version: Version,
    /// Human-readable description, underscores rendered as spaces
    pub description: String,
}

/// Parse a migration file name.
///
/// The grammar is strict: an uppercase `V`, one or more ASCII digits, a
/// double underscore, a non-empty description and the `.sql` extension.
pub fn parse_filename(filename: &str) -> Result<ParsedFilename, MigrationModelError> {
    let invalid = |reason: &str| MigrationModelError::InvalidFilename {
        filename: filename.to_string(),
        reason: reason.to_string(),
    };

    let stem = filename
        .strip_suffix(MIGRATION_EXTENSION)
        .ok_or_else(|| invalid("missing '.sql' extension"))?;
    let rest = stem
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| invalid("missing 'V' prefix"))?;
    let (digits, description) = rest
        .split_once(DESCRIPTION_SEPARATOR)
        .ok_or_else(|| invalid("missing '__' between version and description"))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("version must be one or more digits"));
    }
    let version = digits
        .parse::<u64>()
        .map(Version::new)
        .map_err(|_| invalid("version is out of range"))?;

    let description = description.replace('_', " ").trim().to_string();
    if description.is_empty() {
        return Err(invalid("description is empty"));
    }

    Ok(ParsedFilename {
        version,
        description,
    })
}

/// Turn a free-form description into a file name slug
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `_` and trims leading/trailing separators.
pub fn slugify(description: &str) -> Result<String, MigrationModelError> {
    let mut slug = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_').to_string();

    if slug.is_empty() {
        return Err(MigrationModelError::InvalidDescription {
            description: description.to_string(),
        });
    }
    Ok(slug)
}

/// Canonical file name for a new migration
pub fn filename_for(version: Version, slug: &str) -> String {
    format!(
        "{}{}{}{}{}",
        VERSION_PREFIX, version, DESCRIPTION_SEPARATOR, slug, MIGRATION_EXTENSION
    )
}

/// Ledger table names are interpolated into DDL, so only plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`) are accepted.
pub fn validate_table_name(name: &str) -> Result<(), MigrationModelError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(MigrationModelError::InvalidLedgerTable {
            name: name.to_string(),
        })
    }
}

/// One versioned change script discovered on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: Version,
    pub filename: String,
    pub description: String,
    /// Raw SQL body; parsed at apply time, never persisted
    pub sql: String,
    /// SHA-256 hex digest of `sql`
    pub checksum: String,
}

impl MigrationFile {
    /// Build from a file name and its contents, validating the name
    pub fn new(
        filename: impl Into<String>,
        sql: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Result<Self, MigrationModelError> {
        let filename = filename.into();
        let parsed = parse_filename(&filename)?;
        Ok(Self {
            version: parsed.version,
            filename,
            description: parsed.description,
            sql: sql.into(),
            checksum: checksum.into(),
        })
    }
}

/// One row of the persisted ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub version: Version,
    pub filename: String,
    pub checksum: String,
    pub executed_at: DateTime<Utc>,
}
