//! Canonical task record produced by every ingestion channel.

use serde::{Deserialize, Serialize};

/// Priority assigned when the agent omits or fails to infer one.
pub const DEFAULT_PRIORITY: &str = "Medium";

/// Description used when the agent reply carries no description.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description provided.";

/// Description used when the expansion call failed outright.
pub const DEGRADED_DESCRIPTION: &str = "Task expansion failed; captured raw input.";

/// Title used when even the raw input text is empty.
const UNTITLED: &str = "Untitled task";

/// Characters of raw input kept as the fallback title.
const TITLE_PREFIX_CHARS: usize = 20;

/// Canonical normalized task all channels converge on.
///
/// `priority` is deliberately a free-form string: values are sent to the
/// sink as-is, with no validation against the High/Medium/Low set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Action-oriented title. Never empty: every code path falls back to
    /// a prefix of the raw input text.
    pub name: String,
    /// Workflow description, possibly bullet text.
    pub description: String,
    /// Nominally one of High/Medium/Low, unvalidated.
    pub priority: String,
    /// Deep link to the originating item, if any.
    pub source_link: Option<String>,
}

impl TaskRecord {
    /// Build the degraded record used when expansion fails: a prefix of
    /// the raw input as the title, a fixed description, default priority.
    #[must_use]
    pub fn degraded(raw_text: &str) -> Self {
        Self {
            name: title_from_raw(raw_text),
            description: DEGRADED_DESCRIPTION.into(),
            priority: DEFAULT_PRIORITY.into(),
            source_link: None,
        }
    }

    /// Attach a source link, replacing any previous one.
    #[must_use]
    pub fn with_source_link(mut self, link: impl Into<String>) -> Self {
        self.source_link = Some(link.into());
        self
    }
}

/// Derive a fallback title from raw input text.
///
/// Takes the first [`TITLE_PREFIX_CHARS`] characters, trimmed; empty
/// input yields a fixed placeholder so a record is never unnamed.
#[must_use]
pub fn title_from_raw(raw_text: &str) -> String {
    let prefix: String = raw_text.trim().chars().take(TITLE_PREFIX_CHARS).collect();
    let prefix = prefix.trim().to_owned();
    if prefix.is_empty() {
        UNTITLED.into()
    } else {
        prefix
    }
}
