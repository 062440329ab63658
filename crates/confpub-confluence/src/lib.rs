//! Confluence integration for confpub.
//!
//! This crate provides [`ConfluenceBackend`], the real implementation of the
//! [`Backend`](confpub_backend::Backend) contract over the Confluence REST API:
//!
//! - Page lookup by title, creation and versioned update
//! - Attachment upload (upsert by filename) and listing
//! - OAuth 1.0 RSA-SHA1 or basic authentication
//!
//! HTTP status codes are mapped onto
//! [`BackendErrorKind`](confpub_backend::BackendErrorKind) so the orchestrator
//! can tell races, stale versions and transport failures apart.

mod auth;
mod backend;
mod client;
mod error;
mod oauth;
pub mod types;

pub use backend::ConfluenceBackend;
pub use client::ConfluenceClient;
pub use error::{ConfluenceError, RsaKeyError};

/// Backend identifier for error messages.
pub(crate) const BACKEND: &str = "Confluence";
