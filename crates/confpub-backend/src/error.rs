//! Backend error types.
//!
//! [`BackendError`] carries a semantic [`BackendErrorKind`] that the orchestrator
//! branches on (`AlreadyExists` starts race recovery, `VersionConflict` forces a
//! fresh lookup) and an [`ErrorStatus`] telling the retry policy whether another
//! attempt can help.

/// Semantic error categories shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendErrorKind {
    /// Page or attachment does not exist.
    NotFound,
    /// A page with the same (space, title) already exists.
    AlreadyExists,
    /// The expected version does not match the backend's current version.
    VersionConflict,
    /// Credentials rejected or insufficient permissions.
    PermissionDenied,
    /// Request rejected as malformed.
    InvalidInput,
    /// Backend is temporarily unavailable (connection failure, 5xx).
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (conflicts, not found, invalid input).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Backend error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct BackendError {
    /// Semantic error category.
    pub kind: BackendErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Backend identifier (e.g., "Confluence", "Local", "Mock").
    pub backend: Option<&'static str>,
    /// Page context: `SPACE/Title` or a page identifier.
    pub target: Option<String>,
    /// Human-readable detail (e.g., HTTP response body).
    pub message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    /// Create a new backend error.
    #[must_use]
    pub fn new(kind: BackendErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            backend: None,
            target: None,
            message: None,
            source: None,
        }
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach page context.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attach a detail message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Page does not exist.
    #[must_use]
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound).with_target(target)
    }

    /// Page with this (space, title) already exists.
    #[must_use]
    pub fn already_exists(space: &str, title: &str) -> Self {
        Self::new(BackendErrorKind::AlreadyExists).with_target(format!("{space}/{title}"))
    }

    /// Update presented a stale version.
    #[must_use]
    pub fn version_conflict(page_id: &str, expected: u32, current: u32) -> Self {
        Self::new(BackendErrorKind::VersionConflict)
            .with_target(page_id)
            .with_message(format!("expected version {expected}, current is {current}"))
    }

    /// Create a backend error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, target: Option<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => BackendErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => BackendErrorKind::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => BackendErrorKind::AlreadyExists,
            std::io::ErrorKind::TimedOut => BackendErrorKind::Timeout,
            _ => BackendErrorKind::Other,
        };
        let status = match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        };
        let mut error = Self::new(kind).with_status(status).with_source(err);
        error.target = target;
        error
    }

    /// Whether this error is of the given kind.
    #[must_use]
    pub fn is(&self, kind: BackendErrorKind) -> bool {
        self.kind == kind
    }

    /// Whether retrying the same call may succeed (transport-level failure).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message: source (page: DOCS/Home)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            BackendErrorKind::NotFound => "Not found",
            BackendErrorKind::AlreadyExists => "Already exists",
            BackendErrorKind::VersionConflict => "Version conflict",
            BackendErrorKind::PermissionDenied => "Permission denied",
            BackendErrorKind::InvalidInput => "Invalid input",
            BackendErrorKind::Unavailable => "Unavailable",
            BackendErrorKind::RateLimited => "Rate limited",
            BackendErrorKind::Timeout => "Timeout",
            BackendErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(target) = &self.target {
            write!(f, " (page: {target})")?;
        }

        Ok(())
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}
