//! Error types for Confluence integration.

use std::path::PathBuf;
use std::str::Utf8Error;

use confpub_backend::{BackendError, BackendErrorKind, ErrorStatus};

use crate::BACKEND;

/// Error from Confluence API operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Request URL could not be parsed.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// RSA key loading/parsing error.
    #[error("RSA key error")]
    RsaKey(#[from] RsaKeyError),

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Response was well-formed but missing expected data.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ConfluenceError {
    /// Map to the backend error taxonomy.
    ///
    /// HTTP statuses follow Confluence semantics: a duplicate title is reported
    /// as `400` with an "already exists" message and a stale version as `409`.
    #[must_use]
    pub fn into_backend_error(self) -> BackendError {
        let (kind, status) = match &self {
            Self::HttpRequest(ureq::Error::Timeout(_)) => {
                (BackendErrorKind::Timeout, ErrorStatus::Temporary)
            }
            Self::HttpRequest(_) => (BackendErrorKind::Unavailable, ErrorStatus::Temporary),
            Self::HttpResponse { status, body } => classify_status(*status, body),
            Self::InvalidUrl(_) => (BackendErrorKind::InvalidInput, ErrorStatus::Permanent),
            Self::RsaKey(_) => (BackendErrorKind::PermissionDenied, ErrorStatus::Permanent),
            Self::Json(_) | Self::UnexpectedResponse(_) => {
                (BackendErrorKind::Other, ErrorStatus::Permanent)
            }
        };

        BackendError::new(kind)
            .with_status(status)
            .with_backend(BACKEND)
            .with_source(self)
    }
}

/// Classify an HTTP error status.
fn classify_status(status: u16, body: &str) -> (BackendErrorKind, ErrorStatus) {
    match status {
        400 if body.to_ascii_lowercase().contains("already exists") => {
            (BackendErrorKind::AlreadyExists, ErrorStatus::Permanent)
        }
        400 | 413 | 415 => (BackendErrorKind::InvalidInput, ErrorStatus::Permanent),
        401 | 403 => (BackendErrorKind::PermissionDenied, ErrorStatus::Permanent),
        404 => (BackendErrorKind::NotFound, ErrorStatus::Permanent),
        408 => (BackendErrorKind::Timeout, ErrorStatus::Temporary),
        409 => (BackendErrorKind::VersionConflict, ErrorStatus::Permanent),
        429 => (BackendErrorKind::RateLimited, ErrorStatus::Persistent),
        500..=599 => (BackendErrorKind::Unavailable, ErrorStatus::Persistent),
        _ => (BackendErrorKind::Other, ErrorStatus::Permanent),
    }
}

/// RSA key loading/parsing error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsaKeyError {
    /// Key file could not be read.
    #[error("failed to read key file {}", path.display())]
    Read {
        /// Key file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid UTF-8 in key file.
    #[error("invalid UTF-8 in key")]
    InvalidUtf8(#[from] Utf8Error),

    /// PKCS#1 key parsing error (returned when both formats fail).
    #[error("PKCS#1 key error")]
    Pkcs1(#[from] rsa::pkcs1::Error),
}
