//! Canonical event and operation names for structured logging
//!
//! Field keys are written inline by the `log_op_*` macros since `tracing`
//! field names must be identifiers.

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_MIGRATE: &str = "migrate";
pub const OP_APPLY_MIGRATION: &str = "apply_migration";
pub const OP_STATUS: &str = "status";
pub const OP_VERIFY: &str = "verify";
pub const OP_DISCOVER: &str = "discover_migrations";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!OP_MIGRATE.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_op_names_are_distinct() {
        let ops = [OP_MIGRATE, OP_APPLY_MIGRATION, OP_STATUS, OP_VERIFY, OP_DISCOVER];
        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
