use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Types ──────────────────────────────────────────

/// Store-assigned row identifier (integer or UUID in practice), kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Read an id column value. `null` and missing ids yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self(s.clone())),
            other => Some(Self(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row returned by the similarity search function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// Result of an insert. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    pub success: bool,
    pub id: Option<DocumentId>,
    pub message: String,
}

impl UpsertOutcome {
    pub fn stored(id: DocumentId) -> Self {
        Self {
            success: true,
            id: Some(id),
            message: "document stored".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            message: message.into(),
        }
    }
}
