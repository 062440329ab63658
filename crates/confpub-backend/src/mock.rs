//! Mock backend implementation for testing.
//!
//! Provides [`MockBackend`], an in-memory [`Backend`] with fault injection for
//! the situations a real Confluence instance produces but a local directory
//! never does: concurrent creators, lookups lagging behind writes, concurrent
//! editors and flaky transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::Backend;
use crate::error::{BackendError, BackendErrorKind, ErrorStatus};
use crate::page::{Attachment, RemotePage};

/// Backend identifier for error messages.
const BACKEND: &str = "Mock";

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `find_by_title`
    Find { space: String, title: String },
    /// `create`
    Create {
        space: String,
        title: String,
        parent_id: Option<String>,
    },
    /// `update`
    Update {
        page_id: String,
        expected_version: u32,
    },
    /// `upload_attachment`
    Upload { page_id: String, filename: String },
    /// `list_attachments`
    List { page_id: String },
}

type PageKey = (String, String);

fn key(space: &str, title: &str) -> PageKey {
    (space.to_owned(), title.to_owned())
}

#[derive(Debug, Default)]
struct MockState {
    pages: Vec<RemotePage>,
    attachments: Vec<(Attachment, Vec<u8>)>,
    next_id: u64,
    calls: Vec<MockCall>,
    concurrent_creates: HashSet<PageKey>,
    concurrent_updates: HashSet<PageKey>,
    hidden_finds: HashMap<PageKey, u32>,
    failing_uploads: HashSet<String>,
    transient_failures: u32,
}

impl MockState {
    fn take_transient_failure(&mut self) -> Result<(), BackendError> {
        if self.transient_failures == 0 {
            return Ok(());
        }
        self.transient_failures -= 1;
        Err(BackendError::new(BackendErrorKind::Unavailable)
            .with_status(ErrorStatus::Temporary)
            .with_backend(BACKEND)
            .with_message("injected transport failure"))
    }

    fn insert_page(
        &mut self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> RemotePage {
        self.next_id += 1;
        let page = RemotePage {
            id: (100 + self.next_id).to_string(),
            title: title.to_owned(),
            space: space.to_owned(),
            version: 1,
            content: content.to_owned(),
            parent_id: parent_id.map(str::to_owned),
        };
        self.pages.push(page.clone());
        page
    }

    fn find(&self, space: &str, title: &str) -> Option<&RemotePage> {
        self.pages
            .iter()
            .find(|p| p.space == space && p.title == title)
    }
}

/// Mock backend for testing.
///
/// Stores pages and attachments in memory and records every call. Use the
/// builder methods to seed pages and inject faults.
///
/// # Example
///
/// ```ignore
/// use confpub_backend::{Backend, MockBackend};
///
/// let backend = MockBackend::new()
///     .with_page("DOCS", "Home", "<p>old</p>")
///     .with_concurrent_create("DOCS", "Guide");
///
/// let err = backend.create("DOCS", "Guide", "", None).await.unwrap_err();
/// assert!(err.is(BackendErrorKind::AlreadyExists));
/// ```
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing page at version 1.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, space: &str, title: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .insert_page(space, title, content, None);
        self
    }

    /// Make the first `create` of this page lose a race against another actor.
    ///
    /// The page is created as if by someone else and the call fails with
    /// `AlreadyExists`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_concurrent_create(self, space: &str, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .concurrent_creates
            .insert(key(space, title));
        self
    }

    /// Make the next `n` lookups of this page miss, as an eventually consistent
    /// search index would.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_hidden_finds(self, space: &str, title: &str, n: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .hidden_finds
            .insert(key(space, title), n);
        self
    }

    /// Make the next `update` of this page race against another editor.
    ///
    /// The page's version is bumped right before the caller's update is checked.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_concurrent_update(self, space: &str, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .concurrent_updates
            .insert(key(space, title));
        self
    }

    /// Reject every upload of this filename.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_upload(self, filename: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(filename.to_owned());
        self
    }

    /// Fail the next `n` calls, whatever they are, with a temporary transport error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.state.lock().unwrap().transient_failures = n;
        self
    }

    /// All pages currently stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn pages(&self) -> Vec<RemotePage> {
        self.state.lock().unwrap().pages.clone()
    }

    /// Page by space and title.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn page(&self, space: &str, title: &str) -> Option<RemotePage> {
        self.state.lock().unwrap().find(space, title).cloned()
    }

    /// Every call made so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Bytes of an uploaded attachment.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn attachment_data(&self, page_id: &str, filename: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .iter()
            .find(|(a, _)| a.page_id == page_id && a.filename == filename)
            .map(|(_, data)| data.clone())
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn find_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<RemotePage>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Find {
            space: space.to_owned(),
            title: title.to_owned(),
        });
        state.take_transient_failure()?;

        if let Some(remaining) = state.hidden_finds.get_mut(&key(space, title))
            && *remaining > 0
        {
            *remaining -= 1;
            return Ok(None);
        }

        Ok(state.find(space, title).cloned())
    }

    async fn create(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<RemotePage, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Create {
            space: space.to_owned(),
            title: title.to_owned(),
            parent_id: parent_id.map(str::to_owned),
        });
        state.take_transient_failure()?;

        if state.concurrent_creates.remove(&key(space, title)) {
            state.insert_page(space, title, "<p>created elsewhere</p>", parent_id);
            return Err(BackendError::already_exists(space, title).with_backend(BACKEND));
        }
        if state.find(space, title).is_some() {
            return Err(BackendError::already_exists(space, title).with_backend(BACKEND));
        }

        Ok(state.insert_page(space, title, content, parent_id))
    }

    async fn update(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        expected_version: u32,
    ) -> Result<RemotePage, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Update {
            page_id: page_id.to_owned(),
            expected_version,
        });
        state.take_transient_failure()?;

        let MockState {
            pages,
            concurrent_updates,
            ..
        } = &mut *state;
        let page = pages
            .iter_mut()
            .find(|p| p.id == page_id)
            .ok_or_else(|| BackendError::not_found(page_id).with_backend(BACKEND))?;

        if concurrent_updates.remove(&key(&page.space, &page.title)) {
            page.version += 1;
        }
        if page.version != expected_version {
            return Err(
                BackendError::version_conflict(page_id, expected_version, page.version)
                    .with_backend(BACKEND),
            );
        }

        page.version += 1;
        title.clone_into(&mut page.title);
        content.clone_into(&mut page.content);
        Ok(page.clone())
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Upload {
            page_id: page_id.to_owned(),
            filename: filename.to_owned(),
        });
        state.take_transient_failure()?;

        if !state.pages.iter().any(|p| p.id == page_id) {
            return Err(BackendError::not_found(page_id).with_backend(BACKEND));
        }
        if state.failing_uploads.contains(filename) {
            return Err(BackendError::new(BackendErrorKind::InvalidInput)
                .with_backend(BACKEND)
                .with_target(page_id)
                .with_message(format!("upload of {filename} rejected")));
        }

        let attachment = Attachment {
            id: format!("att-{page_id}-{filename}"),
            filename: filename.to_owned(),
            page_id: page_id.to_owned(),
            size: Some(data.len() as u64),
        };
        state
            .attachments
            .retain(|(a, _)| !(a.page_id == page_id && a.filename == filename));
        state.attachments.push((attachment.clone(), data.to_vec()));
        Ok(attachment)
    }

    async fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::List {
            page_id: page_id.to_owned(),
        });
        state.take_transient_failure()?;

        Ok(state
            .attachments
            .iter()
            .filter(|(a, _)| a.page_id == page_id)
            .map(|(a, _)| a.clone())
            .collect())
    }
}
