//! Published page and attachment types.

use serde::{Deserialize, Serialize};

/// A page as seen by a backend.
///
/// `(space, title)` is the identity the orchestrator respects; `id` is assigned
/// by the backend and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    /// Backend-assigned identifier.
    pub id: String,
    /// Page title, unique within the space.
    pub title: String,
    /// Space key.
    pub space: String,
    /// Version counter, starts at 1 and grows by exactly 1 per update.
    pub version: u32,
    /// Page content in storage format.
    pub content: String,
    /// Identifier of the parent page, if any.
    pub parent_id: Option<String>,
}

impl RemotePage {
    /// `SPACE/Title` label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.space, self.title)
    }
}

/// A named file bound to exactly one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Backend-assigned attachment identifier.
    pub id: String,
    /// Filename, unique per page.
    pub filename: String,
    /// Owning page identifier.
    pub page_id: String,
    /// Size in bytes, when the backend reports it.
    pub size: Option<u64>,
}
