//! Outcome of a publish run.

use std::fmt;

use confpub_backend::{Attachment, BackendError, RemotePage};

/// What happened to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    /// Page did not exist and was created.
    Created,
    /// Existing page was updated.
    Updated,
    /// Create lost a race; the page appeared on re-lookup and was updated.
    Recovered,
}

impl fmt::Display for PageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recovered => "recovered",
        })
    }
}

/// An attachment that could not be uploaded.
#[derive(Debug)]
pub struct FailedAttachment {
    /// Attachment filename.
    pub filename: String,
    /// Upload error.
    pub error: BackendError,
}

/// A page that reached its final state.
#[derive(Debug)]
pub struct PublishedPage {
    /// Page as last returned by the backend.
    pub page: RemotePage,
    /// Action taken.
    pub action: PageAction,
    /// Attachments uploaded during this run.
    pub attachments: Vec<Attachment>,
    /// Attachments whose upload failed.
    pub failed_attachments: Vec<FailedAttachment>,
}

/// Pages published by one run, in publish order.
#[derive(Debug, Default)]
pub struct PublishRun {
    /// Published pages.
    pub pages: Vec<PublishedPage>,
}

impl PublishRun {
    /// Number of pages that ended with `action`.
    #[must_use]
    pub fn count(&self, action: PageAction) -> usize {
        self.pages.iter().filter(|p| p.action == action).count()
    }

    /// Published page by space and title.
    #[must_use]
    pub fn page(&self, space: &str, title: &str) -> Option<&PublishedPage> {
        self.pages
            .iter()
            .find(|p| p.page.space == space && p.page.title == title)
    }

    /// Every failed attachment with the page it belongs to.
    pub fn failed_attachments(&self) -> impl Iterator<Item = (&RemotePage, &FailedAttachment)> {
        self.pages
            .iter()
            .flat_map(|p| p.failed_attachments.iter().map(move |f| (&p.page, f)))
    }

    /// Whether every attachment was uploaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_attachments().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use confpub_backend::BackendErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn page(title: &str, action: PageAction) -> PublishedPage {
        PublishedPage {
            page: RemotePage {
                id: title.to_lowercase(),
                title: title.to_owned(),
                space: "DOCS".to_owned(),
                version: 1,
                content: String::new(),
                parent_id: None,
            },
            action,
            attachments: Vec::new(),
            failed_attachments: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_lookup() {
        let run = PublishRun {
            pages: vec![
                page("Root", PageAction::Created),
                page("Child", PageAction::Updated),
                page("Other", PageAction::Updated),
            ],
        };

        assert_eq!(run.count(PageAction::Created), 1);
        assert_eq!(run.count(PageAction::Updated), 2);
        assert_eq!(run.count(PageAction::Recovered), 0);
        assert_eq!(run.page("DOCS", "Child").unwrap().page.id, "child");
        assert!(run.page("OPS", "Child").is_none());
    }

    #[test]
    fn test_failed_attachments() {
        let mut root = page("Root", PageAction::Created);
        root.failed_attachments.push(FailedAttachment {
            filename: "big.bin".to_owned(),
            error: BackendError::new(BackendErrorKind::InvalidInput),
        });
        let run = PublishRun {
            pages: vec![root, page("Child", PageAction::Created)],
        };

        let failed: Vec<_> = run
            .failed_attachments()
            .map(|(page, f)| (page.title.as_str(), f.filename.as_str()))
            .collect();

        assert_eq!(failed, vec![("Root", "big.bin")]);
        assert!(!run.is_clean());
        assert!(PublishRun::default().is_clean());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(PageAction::Recovered.to_string(), "recovered");
    }
}
