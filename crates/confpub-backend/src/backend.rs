//! The backend contract.

use async_trait::async_trait;
use tracing::debug;

use crate::error::BackendError;
use crate::page::{Attachment, RemotePage};

/// Capability interface shared by the Confluence client and the simulated backend.
///
/// Implementations must behave identically from the caller's point of view:
///
/// - "not found" is `Ok(None)` from [`find_by_title`](Backend::find_by_title),
///   never an error;
/// - [`create`](Backend::create) reports a taken `(space, title)` as
///   [`BackendErrorKind::AlreadyExists`](crate::BackendErrorKind::AlreadyExists);
/// - [`update`](Backend::update) rejects a stale `expected_version` with
///   [`BackendErrorKind::VersionConflict`](crate::BackendErrorKind::VersionConflict)
///   and otherwise returns the page at `expected_version + 1`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend identifier for logs and errors.
    fn name(&self) -> &'static str;

    /// Look up a page by title within a space.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] only for genuine transport or backend failures.
    async fn find_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<RemotePage>, BackendError>;

    /// Create a page at version 1.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a page with this `(space, title)` exists.
    async fn create(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<RemotePage, BackendError>;

    /// Replace title and content of an existing page.
    ///
    /// `expected_version` is the version last observed by the caller.
    ///
    /// # Errors
    ///
    /// Returns `VersionConflict` if `expected_version` is stale.
    async fn update(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        expected_version: u32,
    ) -> Result<RemotePage, BackendError>;

    /// Create the page if absent, otherwise update it.
    ///
    /// `parent_title` is resolved through [`find_by_title`](Backend::find_by_title).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `parent_title` does not resolve, or any error of the
    /// underlying calls.
    async fn upsert(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_title: Option<&str>,
    ) -> Result<RemotePage, BackendError> {
        let parent_id = match parent_title {
            Some(parent) => {
                let page = self
                    .find_by_title(space, parent)
                    .await?
                    .ok_or_else(|| {
                        BackendError::not_found(format!("{space}/{parent}"))
                            .with_backend(self.name())
                    })?;
                Some(page.id)
            }
            None => None,
        };

        if let Some(existing) = self.find_by_title(space, title).await? {
            debug!(space, title, version = existing.version, "upsert: updating");
            return self
                .update(&existing.id, title, content, existing.version)
                .await;
        }

        debug!(space, title, "upsert: creating");
        self.create(space, title, content, parent_id.as_deref())
            .await
    }

    /// Upload a file to a page, replacing an attachment with the same filename.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the page does not exist or the upload fails.
    async fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, BackendError>;

    /// List attachments on a page.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the page does not exist or listing fails.
    async fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, BackendError>;
}
