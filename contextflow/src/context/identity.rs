//! Run identity for correlating a pipeline run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one pipeline run and the conversation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,

    /// The request ID of the external trigger, if the caller has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,

    /// The conversation session.
    pub session_id: String,

    /// The user the agent is talking to.
    pub user_id: String,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            request_id: None,
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Converts to a dictionary with string values (or null).
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert(
            "request_id".to_string(),
            self.request_id
                .map_or(serde_json::Value::Null, |id| serde_json::json!(id.to_string())),
        );
        map.insert("session_id".to_string(), serde_json::json!(self.session_id));
        map.insert("user_id".to_string(), serde_json::json!(self.user_id));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new() {
        let identity = RunIdentity::new("session-1", "user-1");
        assert_eq!(identity.session_id, "session-1");
        assert_eq!(identity.user_id, "user-1");
        assert!(identity.request_id.is_none());
        assert_ne!(identity.run_id, RunIdentity::new("session-1", "user-1").run_id);
    }

    #[test]
    fn test_run_identity_to_dict() {
        let identity = RunIdentity::new("s", "u").with_request_id(Uuid::new_v4());
        let dict = identity.to_dict();

        assert!(!dict["request_id"].is_null());
        assert_eq!(dict["session_id"], "s");
    }
}
