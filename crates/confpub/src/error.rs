//! CLI error types.

use confpub_config::ConfigError;
use confpub_confluence::ConfluenceError;
use confpub_publish::PublishError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Confluence(#[from] ConfluenceError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
