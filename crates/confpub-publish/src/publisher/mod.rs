//! Publishing orchestrator.
//!
//! Walks the declared page tree root first and drives every page through an
//! explicit protocol:
//!
//! ```text
//! Searching ─┬─> Updating ──────────────────────────┬─> [Attaching] ─> Recursing
//!            └─> Creating ─┬────────────────────────┴─> [Attaching ─> Rerendering ─> FinalUpdate] ─> Recursing
//!                          └─> RaceRecovery ─> Updating
//! ```
//!
//! Attachment URLs embed the page identifier, which a new page only gets from
//! its create response. Created pages with attachments are therefore rendered
//! twice: once without URLs to obtain an identifier, and once more after the
//! upload. Existing pages already know their identifier and are rendered once,
//! with the URLs of the scanned files. If any of those uploads fails, the page
//! is rendered again from the attachments the backend lists, so it never links
//! a file that was not stored.
//!
//! The page tree is validated before the first backend call.
//!
//! Every update carries the version last returned by the backend. A version
//! conflict re-reads the page and retries with the fresh version; transient
//! transport failures are retried per call.

mod error;
mod result;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, warn};

use confpub_backend::{Attachment, Backend, BackendError, BackendErrorKind, RemotePage};
use confpub_config::{Config, PageSpec, validate_pages};

pub use error::{PublishError, PublishErrorKind, PublishState};
pub use result::{FailedAttachment, PageAction, PublishRun, PublishedPage};

use crate::attachments::{AttachmentFile, scan_attachments};
use crate::renderer::{ContentRenderer, RenderContext};
use crate::retry::RetryPolicy;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Attachment URL prefix handed to the renderer.
    pub attachment_base_url: String,
    /// Retry of individual backend calls on transport failures.
    pub transport_retry: RetryPolicy,
    /// Lookups after a create reported the page as existing.
    pub race_retry: RetryPolicy,
    /// Refresh-and-update rounds on version conflicts.
    pub conflict_retry: RetryPolicy,
}

impl PublishOptions {
    /// Default policies with the given attachment URL prefix.
    #[must_use]
    pub fn new(attachment_base_url: impl Into<String>) -> Self {
        Self {
            attachment_base_url: attachment_base_url.into(),
            transport_retry: RetryPolicy::default(),
            race_retry: RetryPolicy::race_recovery(),
            conflict_retry: RetryPolicy::default(),
        }
    }

    /// Options from the `[publish]` section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            transport_retry: RetryPolicy::new(
                config.publish.retry_attempts,
                Duration::from_millis(config.publish.retry_backoff_ms),
            ),
            ..Self::new(config.attachment_base_url())
        }
    }
}

/// Publishes a page tree through a [`Backend`].
pub struct Publisher<'a> {
    backend: &'a dyn Backend,
    renderer: &'a dyn ContentRenderer,
    options: PublishOptions,
}

/// A page waiting to be published.
struct Pending<'t> {
    node: &'t PageSpec,
    parent: Option<Arc<Resolved>>,
}

/// A published page as its children see it.
struct Resolved {
    spec: PageSpec,
    page_id: String,
}

enum Step {
    Searching,
    Updating {
        existing: RemotePage,
        action: PageAction,
    },
    Creating,
    RaceRecovery,
    Attaching {
        page: RemotePage,
        action: PageAction,
        created: bool,
    },
    Rerendering {
        page: RemotePage,
        action: PageAction,
    },
    FinalUpdate {
        page: RemotePage,
        content: String,
        action: PageAction,
    },
    Recursing {
        page: RemotePage,
        action: PageAction,
    },
}

impl Step {
    fn state(&self) -> PublishState {
        match self {
            Self::Searching => PublishState::Searching,
            Self::Updating { .. } => PublishState::Updating,
            Self::Creating => PublishState::Creating,
            Self::RaceRecovery => PublishState::RaceRecovery,
            Self::Attaching { .. } => PublishState::Attaching,
            Self::Rerendering { .. } => PublishState::Rerendering,
            Self::FinalUpdate { .. } => PublishState::FinalUpdate,
            Self::Recursing { .. } => PublishState::Recursing,
        }
    }
}

/// Fatal error of a single page, before run context is attached.
#[derive(Debug)]
struct PageFailure {
    state: PublishState,
    kind: PublishErrorKind,
}

fn at<E: Into<PublishErrorKind>>(state: PublishState) -> impl FnOnce(E) -> PageFailure {
    move |err| PageFailure {
        state,
        kind: err.into(),
    }
}

impl<'a> Publisher<'a> {
    /// Create a publisher.
    #[must_use]
    pub fn new(
        backend: &'a dyn Backend,
        renderer: &'a dyn ContentRenderer,
        options: PublishOptions,
    ) -> Self {
        Self {
            backend,
            renderer,
            options,
        }
    }

    /// Publish `pages` and their descendants, parents before children.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] in the [`Validating`](PublishState::Validating)
    /// state if the tree is invalid, and on the first page that cannot be
    /// published.
    /// The run stops there; the error lists the pages that were skipped.
    /// Attachment upload failures are not fatal and are reported in the
    /// returned [`PublishRun`].
    pub async fn publish(&self, pages: &[PageSpec]) -> Result<PublishRun, PublishError> {
        if let Err(error) = validate_pages(pages) {
            let mut skipped = Vec::new();
            for page in pages {
                pending_labels(page, None, &mut skipped);
            }
            return Err(PublishError {
                space: String::new(),
                title: String::new(),
                state: PublishState::Validating,
                kind: error.into(),
                skipped,
                completed: PublishRun::default(),
            });
        }

        info!(backend = self.backend.name(), "Publishing pages");
        let mut run = PublishRun::default();
        let mut pending: Vec<Pending<'_>> = pages
            .iter()
            .rev()
            .map(|node| Pending { node, parent: None })
            .collect();

        while let Some(Pending { node, parent }) = pending.pop() {
            let mut spec = node.effective(parent.as_deref().map(|p| &p.spec));
            if let Some(parent) = &parent {
                spec.parent_title = Some(parent.spec.title.clone());
            }
            let parent_id = parent.as_ref().map(|p| p.page_id.clone());

            let span = info_span!(
                "page",
                space = spec.space().unwrap_or_default(),
                title = spec.title.as_str()
            );
            match self.publish_page(&spec, parent_id).instrument(span).await {
                Ok(published) => {
                    let resolved = Arc::new(Resolved {
                        page_id: published.page.id.clone(),
                        spec,
                    });
                    pending.extend(node.children.iter().rev().map(|child| Pending {
                        node: child,
                        parent: Some(Arc::clone(&resolved)),
                    }));
                    run.pages.push(published);
                }
                Err(failure) => {
                    let mut skipped = Vec::new();
                    for child in &node.children {
                        pending_labels(child, Some(&spec), &mut skipped);
                    }
                    for rest in pending.iter().rev() {
                        pending_labels(rest.node, rest.parent.as_deref().map(|p| &p.spec), &mut skipped);
                    }
                    return Err(PublishError {
                        space: spec.space().unwrap_or_default().to_owned(),
                        title: spec.title,
                        state: failure.state,
                        kind: failure.kind,
                        skipped,
                        completed: run,
                    });
                }
            }
        }

        info!(
            created = run.count(PageAction::Created),
            updated = run.count(PageAction::Updated),
            recovered = run.count(PageAction::Recovered),
            "Publish complete"
        );
        Ok(run)
    }

    /// Run the per-page protocol for an effective spec.
    #[allow(clippy::too_many_lines)]
    async fn publish_page(
        &self,
        spec: &PageSpec,
        parent_id: Option<String>,
    ) -> Result<PublishedPage, PageFailure> {
        let space = spec.space().unwrap_or_default();
        let title = spec.title.as_str();
        let base_url = self.options.attachment_base_url.as_str();

        let parent_id = match parent_id {
            Some(id) => Some(id),
            None => self
                .resolve_declared_parent(space, spec)
                .await
                .map_err(at(PublishState::Searching))?,
        };
        let files = Self::scan(spec).await;
        let mut uploaded: Vec<Attachment> = Vec::new();
        let mut failed: Vec<FailedAttachment> = Vec::new();

        let mut step = Step::Searching;
        loop {
            let state = step.state();
            step = match step {
                Step::Searching => match self.find(space, title).await.map_err(at(state))? {
                    Some(existing) => {
                        debug!(page_id = %existing.id, version = existing.version, "Found page");
                        check_parent(&existing, parent_id.as_deref());
                        Step::Updating {
                            existing,
                            action: PageAction::Updated,
                        }
                    }
                    None => Step::Creating,
                },

                Step::Updating { existing, action } => {
                    let context = RenderContext::new(spec, base_url)
                        .with_page(&existing.id, files.iter().map(|f| f.filename.as_str()));
                    let content = self.renderer.render(spec, &context).map_err(at(state))?;
                    let page = self
                        .update(space, title, &existing, &content)
                        .await
                        .map_err(at(state))?;
                    info!(page_id = %page.id, version = page.version, "Updated page");
                    next_after_write(page, action, &files, false)
                }

                Step::Creating => {
                    let context = RenderContext::new(spec, base_url);
                    let content = self.renderer.render(spec, &context).map_err(at(state))?;
                    let created = self
                        .call(|| {
                            self.backend
                                .create(space, title, &content, parent_id.as_deref())
                        })
                        .await;
                    match created {
                        Ok(page) => {
                            info!(page_id = %page.id, "Created page");
                            next_after_write(page, PageAction::Created, &files, true)
                        }
                        Err(error) if error.is(BackendErrorKind::AlreadyExists) => {
                            info!("Page was created concurrently, looking it up again");
                            Step::RaceRecovery
                        }
                        Err(error) => return Err(at(state)(error)),
                    }
                }

                Step::RaceRecovery => {
                    let race_retry = self.options.race_retry;
                    let found = race_retry
                        .retry_if(
                            |attempt| {
                                debug!(attempt, "Race recovery lookup");
                                self.find(space, title)
                            },
                            |_| false,
                            Option::is_none,
                        )
                        .await
                        .map_err(at(state))?;
                    match found {
                        Some(existing) => {
                            info!(page_id = %existing.id, version = existing.version, "Recovered page");
                            Step::Updating {
                                existing,
                                action: PageAction::Recovered,
                            }
                        }
                        None => {
                            return Err(PageFailure {
                                state,
                                kind: PublishErrorKind::RaceUnresolved {
                                    attempts: race_retry.max_attempts.max(1),
                                },
                            });
                        }
                    }
                }

                Step::Attaching {
                    page,
                    action,
                    created,
                } => {
                    for file in &files {
                        match self.upload(&page.id, file).await {
                            Ok(attachment) => {
                                debug!(file = %file.filename, "Uploaded attachment");
                                uploaded.push(attachment);
                            }
                            Err(error) => {
                                warn!(file = %file.filename, %error, "Attachment upload failed");
                                failed.push(FailedAttachment {
                                    filename: file.filename.clone(),
                                    error,
                                });
                            }
                        }
                    }
                    info!(
                        uploaded = uploaded.len(),
                        failed = failed.len(),
                        "Attachments processed"
                    );
                    if created || !failed.is_empty() {
                        Step::Rerendering { page, action }
                    } else {
                        Step::Recursing { page, action }
                    }
                }

                Step::Rerendering { page, action } => {
                    let listed = self
                        .call(|| self.backend.list_attachments(&page.id))
                        .await
                        .map_err(at(state))?;
                    let context = RenderContext::new(spec, base_url)
                        .with_page(&page.id, listed.iter().map(|a| a.filename.as_str()));
                    let content = self.renderer.render(spec, &context).map_err(at(state))?;
                    Step::FinalUpdate {
                        page,
                        content,
                        action,
                    }
                }

                Step::FinalUpdate {
                    page,
                    content,
                    action,
                } => {
                    let page = self
                        .update(space, title, &page, &content)
                        .await
                        .map_err(at(state))?;
                    info!(page_id = %page.id, version = page.version, "Applied final update");
                    Step::Recursing { page, action }
                }

                Step::Recursing { page, action } => {
                    return Ok(PublishedPage {
                        page,
                        action,
                        attachments: uploaded,
                        failed_attachments: failed,
                    });
                }
            };
        }
    }

    /// Identifier of a root page's declared `parent_title`.
    async fn resolve_declared_parent(
        &self,
        space: &str,
        spec: &PageSpec,
    ) -> Result<Option<String>, PublishErrorKind> {
        let Some(parent_title) = spec.parent_title.as_deref() else {
            return Ok(None);
        };
        match self.find(space, parent_title).await? {
            Some(parent) => {
                debug!(parent_title, parent_id = %parent.id, "Resolved declared parent");
                Ok(Some(parent.id))
            }
            None => Err(PublishErrorKind::ParentNotFound(parent_title.to_owned())),
        }
    }

    /// Files to attach, if the page embeds an application.
    async fn scan(spec: &PageSpec) -> Vec<AttachmentFile> {
        let (Some(_), Some(build_dir)) = (spec.macro_template(), spec.build_dir.clone()) else {
            return Vec::new();
        };
        let set = spec.attachment_set();
        let dir = build_dir.clone();
        match tokio::task::spawn_blocking(move || scan_attachments(&dir, &set)).await {
            Ok(Ok(files)) => files,
            Ok(Err(error)) => {
                warn!(dir = %build_dir.display(), %error, "Cannot scan build directory, skipping attachments");
                Vec::new()
            }
            Err(error) => {
                warn!(dir = %build_dir.display(), %error, "Build directory scan aborted, skipping attachments");
                Vec::new()
            }
        }
    }

    async fn find(&self, space: &str, title: &str) -> Result<Option<RemotePage>, BackendError> {
        self.call(|| self.backend.find_by_title(space, title)).await
    }

    /// Update with the known version, re-reading it after a conflict.
    async fn update(
        &self,
        space: &str,
        title: &str,
        page: &RemotePage,
        content: &str,
    ) -> Result<RemotePage, BackendError> {
        self.options
            .conflict_retry
            .retry(
                |attempt| self.update_attempt(attempt, space, title, page, content),
                |error: &BackendError| error.is(BackendErrorKind::VersionConflict),
            )
            .await
    }

    async fn update_attempt(
        &self,
        attempt: u32,
        space: &str,
        title: &str,
        page: &RemotePage,
        content: &str,
    ) -> Result<RemotePage, BackendError> {
        let (id, version) = if attempt == 0 {
            (page.id.clone(), page.version)
        } else {
            let fresh = self.find(space, title).await?.ok_or_else(|| {
                BackendError::not_found(format!("{space}/{title}")).with_backend(self.backend.name())
            })?;
            debug!(page_id = %fresh.id, version = fresh.version, "Refreshed version after conflict");
            (fresh.id, fresh.version)
        };
        self.call(|| self.backend.update(&id, title, content, version))
            .await
    }

    async fn upload(&self, page_id: &str, file: &AttachmentFile) -> Result<Attachment, BackendError> {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| BackendError::io(e, Some(file.path.display().to_string())))?;
        self.call(|| self.backend.upload_attachment(page_id, &file.filename, &data))
            .await
    }

    /// Run a backend call, retrying transient failures.
    async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        self.options
            .transport_retry
            .retry(
                |_| op(),
                |error: &BackendError| {
                    let transient = error.is_transient();
                    if transient {
                        warn!(%error, "Transient backend failure");
                    }
                    transient
                },
            )
            .await
    }
}

/// Step after a successful create or update.
fn next_after_write(
    page: RemotePage,
    action: PageAction,
    files: &[AttachmentFile],
    created: bool,
) -> Step {
    if files.is_empty() {
        Step::Recursing { page, action }
    } else {
        Step::Attaching {
            page,
            action,
            created,
        }
    }
}

/// Warn when an existing page sits under another parent than declared.
fn check_parent(existing: &RemotePage, expected: Option<&str>) {
    if let Some(expected) = expected
        && existing.parent_id.as_deref() != Some(expected)
    {
        warn!(
            page_id = %existing.id,
            expected_parent = expected,
            actual_parent = existing.parent_id.as_deref().unwrap_or("none"),
            "Page is under a different parent, leaving it in place"
        );
    }
}

/// Labels of `node` and its descendants, in publish order.
fn pending_labels(node: &PageSpec, parent: Option<&PageSpec>, out: &mut Vec<String>) {
    let spec = node.effective(parent);
    out.push(spec.label());
    for child in &node.children {
        pending_labels(child, Some(&spec), out);
    }
}
