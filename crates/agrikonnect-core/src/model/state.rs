//! Per-version migration lifecycle

use crate::errors::MigrationModelError;
use crate::model::Version;
use serde::Serialize;
use std::fmt;

/// Lifecycle of one migration version within a run.
///
/// `Pending -> Applying -> Applied` on success,
/// `Pending -> Applying -> Failed` on failure. `Applied` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Pending,
    Applying,
    Applied,
    Failed,
}

impl MigrationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MigrationState::Applied | MigrationState::Failed)
    }

    /// Move to `next`, rejecting transitions outside the lifecycle
    pub fn transition(
        self,
        version: Version,
        next: MigrationState,
    ) -> Result<MigrationState, MigrationModelError> {
        use MigrationState::*;
        match (self, next) {
            (Pending, Applying) | (Applying, Applied) | (Applying, Failed) => Ok(next),
            _ => Err(MigrationModelError::IllegalTransition {
                version: version.to_string(),
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Pending => "pending",
            MigrationState::Applying => "applying",
            MigrationState::Applied => "applied",
            MigrationState::Failed => "failed",
        };
        f.write_str(s)
    }
}
