//! Migration version value object

use crate::errors::MigrationModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric migration version parsed from the `V<digits>` filename prefix.
///
/// Ordering is numeric, so `V10` sorts after `V9`, and `V001` equals `V1`.
/// The decimal rendering (`1`, `10`) is the representation stored in the
/// ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// The version a newly scaffolded migration should take
    pub fn next(self) -> Option<Version> {
        self.0.checked_add(1).map(Version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts `12` or `V12`.
impl FromStr for Version {
    type Err = MigrationModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('V').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MigrationModelError::InvalidVersion {
                input: s.to_string(),
            });
        }
        digits
            .parse::<u64>()
            .map(Version)
            .map_err(|_| MigrationModelError::InvalidVersion {
                input: s.to_string(),
            })
    }
}
