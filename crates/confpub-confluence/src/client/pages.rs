//! Page operations for Confluence API.

use serde_json::{Value, json};
use tracing::{debug, info};

use super::{ConfluenceClient, read_json};
use crate::error::ConfluenceError;
use crate::oauth::oauth_encode;
use crate::types::{Page, PageResults};

/// Fields expanded on every page lookup.
const PAGE_EXPAND: &str = "body.storage,version,ancestors,space";

impl ConfluenceClient {
    /// Find a page by exact title within a space.
    pub(crate) fn find_page_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<Page>, ConfluenceError> {
        let url = format!(
            "{}/content?{}",
            self.api_url(),
            query_string(&[
                ("spaceKey", space),
                ("title", title),
                ("type", "page"),
                ("expand", PAGE_EXPAND),
            ])
        );

        debug!(space, title, "Searching page");

        let auth_header = self.authorize("GET", &url)?;
        let response = self
            .agent
            .get(&url)
            .header("Authorization", &auth_header)
            .header("Accept", "application/json")
            .call()?;

        let results: PageResults = read_json(response)?;
        Ok(results.results.into_iter().find(|p| p.title == title))
    }

    /// Create a page, optionally under a parent.
    pub(crate) fn create_page(
        &self,
        space: &str,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content?expand={PAGE_EXPAND}", self.api_url());
        let payload = create_payload(space, title, body, parent_id);

        info!(space, title, parent_id, "Creating page");

        let auth_header = self.authorize("POST", &url)?;
        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Page = read_json(response)?;
        info!(space, title, page_id = %page.id, "Created page");
        Ok(page)
    }

    /// Update existing page to `version + 1`.
    pub(crate) fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        version: u32,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{page_id}?expand={PAGE_EXPAND}", self.api_url());
        let payload = update_payload(title, body, version);

        info!(
            page_id,
            title,
            "Updating page from version {} to {}",
            version,
            version + 1
        );

        let auth_header = self.authorize("PUT", &url)?;
        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let page: Page = read_json(response)?;
        info!(page_id, version = page.version.number, "Updated page");
        Ok(page)
    }
}

/// Encode query parameters.
fn query_string(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={}", oauth_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Request body for page creation.
fn create_payload(space: &str, title: &str, body: &str, parent_id: Option<&str>) -> Value {
    let mut payload = json!({
        "type": "page",
        "title": title,
        "space": {"key": space},
        "body": {
            "storage": {
                "value": body,
                "representation": "storage"
            }
        }
    });

    if let Some(parent_id) = parent_id {
        payload["ancestors"] = json!([{"id": parent_id}]);
    }

    payload
}

/// Request body for a page update from `version`.
fn update_payload(title: &str, body: &str, version: u32) -> Value {
    json!({
        "type": "page",
        "title": title,
        "body": {
            "storage": {
                "value": body,
                "representation": "storage"
            }
        },
        "version": {"number": version + 1}
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_query_string_encodes_values() {
        assert_eq!(
            query_string(&[("spaceKey", "DOCS"), ("title", "Q&A / FAQ")]),
            "spaceKey=DOCS&title=Q%26A%20%2F%20FAQ"
        );
    }

    #[test]
    fn test_create_payload_with_parent() {
        let payload = create_payload("DOCS", "Child", "<p>x</p>", Some("42"));

        assert_eq!(
            payload,
            json!({
                "type": "page",
                "title": "Child",
                "space": {"key": "DOCS"},
                "body": {"storage": {"value": "<p>x</p>", "representation": "storage"}},
                "ancestors": [{"id": "42"}]
            })
        );
    }

    #[test]
    fn test_create_payload_without_parent() {
        let payload = create_payload("DOCS", "Root", "", None);

        assert!(payload.get("ancestors").is_none());
    }

    #[test]
    fn test_update_payload_increments_version() {
        let payload = update_payload("Root", "<p>v2</p>", 4);

        assert_eq!(payload["version"]["number"], 5);
        assert_eq!(payload["title"], "Root");
        assert_eq!(payload["body"]["storage"]["value"], "<p>v2</p>");
    }
}
