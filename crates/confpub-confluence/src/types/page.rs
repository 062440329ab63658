//! Confluence page types.

use serde::{Deserialize, Serialize};

/// Confluence page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Space the page belongs to (present when expanded).
    #[serde(default)]
    pub space: Option<Space>,
    /// Version information.
    pub version: Version,
    /// Page body content.
    #[serde(default)]
    pub body: Option<Body>,
    /// Ancestor chain, root first (present when expanded).
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
}

impl Page {
    /// Storage format content, empty when not expanded.
    #[must_use]
    pub fn storage_value(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map_or("", |s| s.value.as_str())
    }

    /// Direct parent ID (last ancestor).
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(|a| a.id.as_str())
    }
}

/// Content search results.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResults {
    /// Matching pages.
    pub results: Vec<Page>,
}

/// Space reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Space {
    /// Space key.
    pub key: String,
}

/// Ancestor reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ancestor {
    /// Ancestor page ID.
    pub id: String,
}

/// Page version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
}

/// Page body content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Body {
    /// Storage format content.
    #[serde(default)]
    pub storage: Option<Storage>,
}

/// Storage format representation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Storage {
    /// HTML content in Confluence storage format.
    pub value: String,
    /// Content representation (always "storage").
    pub representation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search_result() {
        let json = r#"{
            "results": [{
                "id": "12345",
                "type": "page",
                "status": "current",
                "title": "Child",
                "space": {"id": 1, "key": "DOCS", "name": "Docs"},
                "version": {"number": 7, "minorEdit": false},
                "body": {"storage": {"value": "<p>hi</p>", "representation": "storage"}},
                "ancestors": [{"id": "1"}, {"id": "99", "title": "Root"}],
                "_links": {"webui": "/display/DOCS/Child"}
            }],
            "start": 0,
            "limit": 25,
            "size": 1
        }"#;

        let results: PageResults = serde_json::from_str(json).unwrap();
        let page = &results.results[0];

        assert_eq!(page.id, "12345");
        assert_eq!(page.version.number, 7);
        assert_eq!(page.storage_value(), "<p>hi</p>");
        assert_eq!(page.parent_id(), Some("99"));
        assert_eq!(page.space.as_ref().map(|s| s.key.as_str()), Some("DOCS"));
    }

    #[test]
    fn test_deserialize_minimal_page() {
        let json = r#"{"id": "1", "title": "Home", "version": {"number": 1}}"#;

        let page: Page = serde_json::from_str(json).unwrap();

        assert_eq!(page.storage_value(), "");
        assert_eq!(page.parent_id(), None);
    }
}
