//! [`Backend`] implementation over the Confluence REST API.

use std::sync::Arc;

use async_trait::async_trait;

use confpub_backend::{Attachment, Backend, BackendError, BackendErrorKind, RemotePage};

use crate::BACKEND;
use crate::client::ConfluenceClient;
use crate::error::ConfluenceError;
use crate::types;

/// Real Confluence backend.
///
/// The HTTP client is blocking; every call runs on the blocking thread pool.
pub struct ConfluenceBackend {
    client: Arc<ConfluenceClient>,
}

impl ConfluenceBackend {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: ConfluenceClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Run a client call on the blocking pool.
    async fn blocking<T, F>(&self, target: String, call: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&ConfluenceClient) -> Result<T, ConfluenceError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(|e| {
                BackendError::new(BackendErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_target(target.clone())
                    .with_message("blocking task failed")
                    .with_source(e)
            })?
            .map_err(|e| e.into_backend_error().with_target(target))
    }
}

/// Convert an API page, using `space` when the response does not expand it.
fn remote_page(page: types::Page, space: &str) -> RemotePage {
    RemotePage {
        content: page.storage_value().to_owned(),
        parent_id: page.parent_id().map(str::to_owned),
        space: page.space.map_or_else(|| space.to_owned(), |s| s.key),
        id: page.id,
        title: page.title,
        version: page.version.number,
    }
}

fn attachment(attachment: types::Attachment, page_id: &str) -> Attachment {
    Attachment {
        size: attachment.extensions.and_then(|e| e.file_size),
        id: attachment.id,
        filename: attachment.title,
        page_id: page_id.to_owned(),
    }
}

#[async_trait]
impl Backend for ConfluenceBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn find_by_title(
        &self,
        space: &str,
        title: &str,
    ) -> Result<Option<RemotePage>, BackendError> {
        let (owned_space, owned_title) = (space.to_owned(), title.to_owned());
        let page = self
            .blocking(format!("{space}/{title}"), move |client| {
                client.find_page_by_title(&owned_space, &owned_title)
            })
            .await?;
        Ok(page.map(|p| remote_page(p, space)))
    }

    async fn create(
        &self,
        space: &str,
        title: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<RemotePage, BackendError> {
        let (owned_space, owned_title, owned_content) =
            (space.to_owned(), title.to_owned(), content.to_owned());
        let parent_id = parent_id.map(str::to_owned);
        let page = self
            .blocking(format!("{space}/{title}"), move |client| {
                client.create_page(
                    &owned_space,
                    &owned_title,
                    &owned_content,
                    parent_id.as_deref(),
                )
            })
            .await?;
        Ok(remote_page(page, space))
    }

    async fn update(
        &self,
        page_id: &str,
        title: &str,
        content: &str,
        expected_version: u32,
    ) -> Result<RemotePage, BackendError> {
        let (owned_id, owned_title, owned_content) =
            (page_id.to_owned(), title.to_owned(), content.to_owned());
        let page = self
            .blocking(page_id.to_owned(), move |client| {
                client.update_page(&owned_id, &owned_title, &owned_content, expected_version)
            })
            .await?;
        Ok(remote_page(page, ""))
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, BackendError> {
        let (owned_id, owned_name, owned_data) =
            (page_id.to_owned(), filename.to_owned(), data.to_vec());
        let uploaded = self
            .blocking(format!("{page_id}/{filename}"), move |client| {
                client.upload_attachment(&owned_id, &owned_name, &owned_data)
            })
            .await?;
        Ok(attachment(uploaded, page_id))
    }

    async fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, BackendError> {
        let owned_id = page_id.to_owned();
        let listed = self
            .blocking(page_id.to_owned(), move |client| {
                client.get_attachments(&owned_id)
            })
            .await?;
        Ok(listed
            .into_iter()
            .map(|a| attachment(a, page_id))
            .collect())
    }
}
