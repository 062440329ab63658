//! Page tree publishing for confpub.
//!
//! [`Publisher`] drives each declared page through find, create or update,
//! attachment upload and re-render against any [`Backend`](confpub_backend::Backend).
//! The same orchestrator runs against Confluence and against the simulated
//! local backend used for dry runs.
//!
//! # Example
//!
//! ```ignore
//! use confpub_publish::{PublishOptions, Publisher, TemplateRenderer};
//!
//! let renderer = TemplateRenderer::new();
//! let publisher = Publisher::new(&backend, &renderer, PublishOptions::from_config(&config));
//! let run = publisher.publish(&config.pages).await?;
//! for page in &run.pages {
//!     println!("{} {} v{}", page.action, page.page.title, page.page.version);
//! }
//! ```

mod attachments;
mod publisher;
mod renderer;
mod retry;
mod template;

pub use attachments::{AttachmentFile, ScanError, scan_attachments};
pub use publisher::{
    FailedAttachment, PageAction, PublishError, PublishErrorKind, PublishOptions, PublishRun,
    PublishState, PublishedPage, Publisher,
};
pub use renderer::{ContentRenderer, RenderContext, RenderError, attachment_url};
pub use retry::RetryPolicy;
pub use template::TemplateRenderer;
