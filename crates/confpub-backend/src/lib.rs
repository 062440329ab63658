//! Backend contract for confpub.
//!
//! This crate provides the [`Backend`] trait that both the real Confluence client
//! and the simulated local backend implement. The publishing orchestrator depends
//! only on this contract, so a dry run exercises exactly the same protocol as a
//! real publish.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Backend`] trait with `find_by_title()`, `create()`, `update()`, `upsert()`,
//!   `upload_attachment()` and `list_attachments()`
//! - [`RemotePage`] and [`Attachment`], the backend's view of published content
//! - [`BackendError`] with a semantic [`BackendErrorKind`] and [`ErrorStatus`]
//!   retry guidance
//! - [`MockBackend`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use confpub_backend::Backend;
//!
//! async fn ensure_home(backend: &dyn Backend) -> Result<(), confpub_backend::BackendError> {
//!     let page = backend.upsert("DOCS", "Home", "<p>Welcome</p>", None).await?;
//!     println!("{} is at version {}", page.title, page.version);
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod page;

pub use backend::Backend;
pub use error::{BackendError, BackendErrorKind, ErrorStatus};
#[cfg(feature = "mock")]
pub use mock::{MockBackend, MockCall};
pub use page::{Attachment, RemotePage};
