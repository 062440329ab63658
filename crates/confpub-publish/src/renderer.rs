//! Content rendering seam.
//!
//! The orchestrator never looks inside templates. It hands a [`RenderContext`]
//! to a [`ContentRenderer`] and publishes whatever comes back.

use std::collections::BTreeMap;
use std::path::PathBuf;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use confpub_config::PageSpec;

/// Characters left unencoded in attachment URL path segments.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Values available to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    /// Space key.
    pub space: String,
    /// Page title.
    pub title: String,
    /// Resolved parent title, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
    /// Render date as `YYYY-MM-DD`.
    pub current_date: String,
    /// Page identifier, absent before the page exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// Attachment URL prefix.
    pub base_url: String,
    /// Attachment filename to download URL.
    pub attachments: BTreeMap<String, String>,
}

impl RenderContext {
    /// Context for an effective page spec, without identifier or attachments.
    #[must_use]
    pub fn new(spec: &PageSpec, base_url: impl Into<String>) -> Self {
        Self {
            space: spec.space().unwrap_or_default().to_owned(),
            title: spec.title.clone(),
            parent_title: spec.parent_title.clone(),
            current_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            page_id: None,
            base_url: base_url.into(),
            attachments: BTreeMap::new(),
        }
    }

    /// Set the page identifier and resolve attachment URLs against it.
    #[must_use]
    pub fn with_page<'f>(
        mut self,
        page_id: &str,
        filenames: impl IntoIterator<Item = &'f str>,
    ) -> Self {
        self.attachments = filenames
            .into_iter()
            .map(|name| {
                (
                    name.to_owned(),
                    attachment_url(&self.base_url, page_id, name),
                )
            })
            .collect();
        self.page_id = Some(page_id.to_owned());
        self
    }
}

/// Download URL of an attachment: `{base_url}/{page_id}/{filename}`.
#[must_use]
pub fn attachment_url(base_url: &str, page_id: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(page_id, PATH_SEGMENT),
        utf8_percent_encode(filename, PATH_SEGMENT)
    )
}

/// Turns a page spec and context into storage-format content.
pub trait ContentRenderer: Send + Sync {
    /// Render page content.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if a template is missing or fails to render.
    fn render(&self, spec: &PageSpec, context: &RenderContext) -> Result<String, RenderError>;
}

/// Error from a [`ContentRenderer`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No template configured for the page.
    #[error("no template configured for {0}")]
    MissingTemplate(String),

    /// Template file could not be read.
    #[error("failed to read template {}", path.display())]
    Io {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Template failed to render.
    #[error("failed to render template {}", path.display())]
    Template {
        /// Template path.
        path: PathBuf,
        /// Template engine error.
        #[source]
        source: minijinja::Error,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_attachment_url() {
        assert_eq!(
            attachment_url("https://wiki.example.com/download/attachments", "123", "app.js"),
            "https://wiki.example.com/download/attachments/123/app.js"
        );
    }

    #[test]
    fn test_attachment_url_encodes_filename() {
        assert_eq!(
            attachment_url("https://x/att/", "123", "my file#1.js"),
            "https://x/att/123/my%20file%231.js"
        );
    }

    #[test]
    fn test_context_without_page() {
        let mut spec = PageSpec::new("Child").with_space("DOCS");
        spec.parent_title = Some("Root".to_owned());

        let context = RenderContext::new(&spec, "https://x/att");

        assert_eq!(context.space, "DOCS");
        assert_eq!(context.title, "Child");
        assert_eq!(context.parent_title.as_deref(), Some("Root"));
        assert_eq!(context.page_id, None);
        assert!(context.attachments.is_empty());
        assert_eq!(context.current_date.len(), 10);
    }

    #[test]
    fn test_context_with_page_resolves_urls() {
        let spec = PageSpec::new("Root").with_space("DOCS");

        let context = RenderContext::new(&spec, "https://x/att").with_page("42", ["app.js", "app.css"]);

        assert_eq!(context.page_id.as_deref(), Some("42"));
        assert_eq!(
            context.attachments,
            BTreeMap::from([
                ("app.css".to_owned(), "https://x/att/42/app.css".to_owned()),
                ("app.js".to_owned(), "https://x/att/42/app.js".to_owned()),
            ])
        );
    }
}
