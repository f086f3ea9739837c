//! Runner configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`agrikonnect.toml` in the working directory, or an explicit path)
//! 3. `AGRIKONNECT__<SECTION>__<KEY>` environment variables, after a `.env`
//!    file has been loaded if one exists
//!
//! Command-line flags are applied on top by the CLI.

use crate::errors::{ExError, ExErrorKind, Result};
use crate::logging_facility::Profile;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "agrikonnect.toml";
pub const ENV_PREFIX: &str = "AGRIKONNECT";
pub const ENV_SEPARATOR: &str = "__";

/// What `migrate` does when an applied file no longer matches its checksum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Log a warning and continue
    #[default]
    Warn,
    /// Abort before applying anything
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
    /// How long a runner waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage/agrikonnect.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory holding `V<digits>__<description>.sql` files
    pub directory: PathBuf,
    /// Ledger table name
    pub ledger_table: String,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("database/migrations"),
            ledger_table: "migrations".to_string(),
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub profile: Profile,
}

/// Complete runner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationsConfig,
    pub logging: LoggingConfig,
}

impl MigrateConfig {
    /// Load configuration from the process environment.
    ///
    /// `path` must exist when given; otherwise `agrikonnect.toml` is read if
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is normal
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ExError::new(ExErrorKind::Config)
                    .with_op("load_config")
                    .with_message(format!("Failed to read .env: {}", e)));
            }
        }
        Self::load_with_env(path, None)
    }

    /// Load configuration, reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env);

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }
}

fn config_error(err: config::ConfigError) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_and_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        // Explicit missing file is an error
        assert!(MigrateConfig::load_with_env(Some(&missing), env(&[])).is_err());

        let cfg = MigrateConfig::default();
        assert_eq!(cfg.migrations.ledger_table, "migrations");
        assert_eq!(cfg.migrations.checksum_policy, ChecksumPolicy::Warn);
        assert_eq!(cfg.database.busy_timeout_ms, 5_000);
        assert_eq!(cfg.logging.profile, Profile::Development);
    }

    #[test]
    fn test_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agrikonnect.toml");
        fs::write(
            &path,
            r#"
[database]
path = "/var/lib/agrikonnect/shop.db"

[migrations]
directory = "sql"
checksum_policy = "fail"

[logging]
profile = "production"
"#,
        )
        .unwrap();

        let cfg = MigrateConfig::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(cfg.database.path, PathBuf::from("/var/lib/agrikonnect/shop.db"));
        assert_eq!(cfg.database.busy_timeout_ms, 5_000);
        assert_eq!(cfg.migrations.directory, PathBuf::from("sql"));
        assert_eq!(cfg.migrations.ledger_table, "migrations");
        assert_eq!(cfg.migrations.checksum_policy, ChecksumPolicy::Fail);
        assert_eq!(cfg.logging.profile, Profile::Production);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agrikonnect.toml");
        fs::write(&path, "[migrations]\nledger_table = \"from_file\"\n").unwrap();

        let cfg = MigrateConfig::load_with_env(
            Some(&path),
            env(&[
                ("AGRIKONNECT__MIGRATIONS__LEDGER_TABLE", "schema_ledger"),
                ("AGRIKONNECT__DATABASE__BUSY_TIMEOUT_MS", "250"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.migrations.ledger_table, "schema_ledger");
        assert_eq!(cfg.database.busy_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agrikonnect.toml");
        fs::write(&path, "[migrations]\nchecksum_policy = \"maybe\"\n").unwrap();

        let err = MigrateConfig::load_with_env(Some(&path), env(&[])).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
        assert_eq!(err.op(), Some("load_config"));
    }
}
