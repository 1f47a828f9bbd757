//! Structured provenance records explaining why the adviser did what it did.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JustificationType {
    Info,
    Warning,
    Error,
}

/// A single justification record: `{type, message, link, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    #[serde(rename = "type")]
    pub kind: JustificationType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Optional unit specific fields such as `package_name`
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Justification {
    pub fn new(kind: JustificationType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            link: None,
            extra: IndexMap::new(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(JustificationType::Error, message)
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
