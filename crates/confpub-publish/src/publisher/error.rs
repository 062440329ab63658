//! Fatal publish errors.

use std::fmt;

use confpub_backend::BackendError;
use confpub_config::ConfigError;

use super::result::PublishRun;
use crate::renderer::RenderError;

/// Protocol state a page was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    /// Checking the page tree before any backend call.
    Validating,
    /// Looking the page (or its declared parent) up.
    Searching,
    /// Updating an existing page.
    Updating,
    /// Creating a missing page.
    Creating,
    /// Re-looking a page up after a create lost a race.
    RaceRecovery,
    /// Uploading attachments.
    Attaching,
    /// Rendering a page again with the attachments it actually has.
    Rerendering,
    /// Writing the re-rendered content.
    FinalUpdate,
    /// Moving on to child pages.
    Recursing,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating the page tree",
            Self::Searching => "searching",
            Self::Updating => "updating",
            Self::Creating => "creating",
            Self::RaceRecovery => "recovering from a create race",
            Self::Attaching => "attaching",
            Self::Rerendering => "re-rendering",
            Self::FinalUpdate => "applying the final update",
            Self::Recursing => "recursing",
        })
    }
}

/// Cause of a fatal page error.
#[derive(Debug, thiserror::Error)]
pub enum PublishErrorKind {
    /// Create reported the page as existing, but it never showed up on lookup.
    #[error("page exists but was not found after {attempts} lookups")]
    RaceUnresolved {
        /// Lookups performed.
        attempts: u32,
    },

    /// Page tree is incomplete or inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Declared parent of a root page does not exist.
    #[error("parent page {0:?} not found")]
    ParentNotFound(String),

    /// Content rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Backend call failed after retries.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A page failed and the run was aborted.
///
/// Carries the pages published before the failure and the ones that were
/// never attempted. A tree rejected before publishing has an empty space and
/// title and the [`Validating`](PublishState::Validating) state.
#[derive(Debug)]
pub struct PublishError {
    /// Space of the failing page.
    pub space: String,
    /// Title of the failing page.
    pub title: String,
    /// State the page was in.
    pub state: PublishState,
    /// What went wrong.
    pub kind: PublishErrorKind,
    /// `SPACE/Title` of pages not attempted, in publish order.
    pub skipped: Vec<String>,
    /// Pages published before the failure.
    pub completed: PublishRun,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            PublishState::Validating => f.write_str("invalid page tree"),
            state => write!(
                f,
                "failed to publish {}/{} while {state}",
                self.space, self.title
            ),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
