use serde::{Deserialize, Serialize};

/// Opaque result returned by the remote worker for a goal request.
///
/// Nothing in the sync engine interprets the payload beyond its presence;
/// [`GoalArtifact::plain_text`] is a best-effort rendering for copying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalArtifact(serde_json::Value);

impl GoalArtifact {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Text suitable for pasting into a document.
    ///
    /// Uses a string `rendered` field when the worker sends one, otherwise
    /// the compact JSON of the payload.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self.0.get("rendered").and_then(|r| r.as_str()) {
            Some(rendered) => rendered.to_string(),
            None => match &self.0 {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}
