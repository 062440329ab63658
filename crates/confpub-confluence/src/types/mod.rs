//! Confluence REST API types.

mod attachment;
mod page;

pub use attachment::{Attachment, AttachmentExtensions, AttachmentsResponse};
pub use page::{Ancestor, Body, Page, PageResults, Space, Storage, Version};
