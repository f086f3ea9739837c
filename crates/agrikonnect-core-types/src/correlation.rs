//! Correlation types for run tracking
//!
//! Every runner invocation carries an explicit [`RequestContext`] instead of
//! reading ambient global state. The context's [`RequestId`] is attached to
//! the log events and errors produced during that invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single runner invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried through a runner invocation
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    /// Who or what started the run (e.g. `cli`, `deploy`)
    pub actor: Option<String>,
}

impl RequestContext {
    /// Create a new context with a fresh RequestId
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            actor: None,
        }
    }

    /// Create a context with an existing RequestId
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            actor: None,
        }
    }

    /// Tag the context with the initiating actor
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
        assert!(!id2.as_str().is_empty());
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_request_context_creation() {
        let ctx = RequestContext::new();
        assert!(!ctx.request_id.as_str().is_empty());
        assert!(ctx.actor.is_none());
    }

    #[test]
    fn test_request_context_with_actor() {
        let ctx = RequestContext::with_request_id(RequestId::from_string("run-1".into()))
            .with_actor("deploy");

        assert_eq!(ctx.request_id.as_str(), "run-1");
        assert_eq!(ctx.actor.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
