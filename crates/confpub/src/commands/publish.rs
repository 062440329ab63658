//! `confpub publish` command implementation.

use std::path::PathBuf;

use clap::Args;
use confpub_config::{CliSettings, Config};
use confpub_confluence::{ConfluenceBackend, ConfluenceClient};
use confpub_local::LocalBackend;
use confpub_publish::{
    PageAction, PublishError, PublishOptions, PublishRun, Publisher, TemplateRenderer,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Path to configuration file (default: auto-discover confpub.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish into a local directory instead of Confluence.
    #[arg(long)]
    dry_run: bool,

    /// Dry-run output directory (overrides config).
    #[arg(short, long, requires = "dry_run")]
    output: Option<PathBuf>,

    /// Attachment URL prefix (overrides config).
    #[arg(long, env = "CONFPUB_ATTACHMENT_BASE_URL")]
    attachment_base_url: Option<String>,

    /// Path to OAuth private key file (overrides config).
    #[arg(short = 'k', long)]
    key_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl PublishArgs {
    /// Execute the publish command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or a page fails to publish.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            dry_run_dir: self.output,
            attachment_base_url: self.attachment_base_url,
            key_file: self.key_file,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "Loaded configuration");
        }

        let options = PublishOptions::from_config(&config);
        let renderer = TemplateRenderer::new();

        let result = if self.dry_run {
            let dir = &config.dry_run_resolved.output_dir;
            output.highlight(&format!("[DRY RUN] Publishing to {}", dir.display()));
            let backend = LocalBackend::new(dir);
            Publisher::new(&backend, &renderer, options)
                .publish(&config.pages)
                .await
        } else {
            let conf = config.require_confluence()?;
            let client = ConfluenceClient::from_config(conf)?;
            output.highlight(&format!("Publishing to {}", client.base_url()));
            let backend = ConfluenceBackend::new(client);
            Publisher::new(&backend, &renderer, options)
                .publish(&config.pages)
                .await
        };

        match result {
            Ok(run) => {
                print_run(&output, &run);
                output.success(&format!("\n{}", summary(&run)));
                Ok(())
            }
            Err(err) => {
                print_run(&output, &err.completed);
                print_skipped(&output, &err);
                Err(err.into())
            }
        }
    }
}

fn print_run(output: &Output, run: &PublishRun) {
    for published in &run.pages {
        output.page(published);
    }
    for (page, failed) in run.failed_attachments() {
        output.warning(&format!(
            "Warning: attachment {} on {} failed: {}",
            failed.filename,
            page.label(),
            failed.error
        ));
    }
}

fn print_skipped(output: &Output, err: &PublishError) {
    if err.skipped.is_empty() {
        return;
    }
    output.warning(&format!("\nSkipped {} page(s):", err.skipped.len()));
    for label in &err.skipped {
        output.info(&format!("  - {label}"));
    }
}

fn summary(run: &PublishRun) -> String {
    format!(
        "Published {} page(s): {} created, {} updated, {} recovered",
        run.pages.len(),
        run.count(PageAction::Created),
        run.count(PageAction::Updated),
        run.count(PageAction::Recovered)
    )
}

#[cfg(test)]
mod tests {
    use confpub_backend::RemotePage;
    use confpub_publish::PublishedPage;
    use pretty_assertions::assert_eq;

    use super::*;

    fn published(title: &str, action: PageAction) -> PublishedPage {
        PublishedPage {
            page: RemotePage {
                id: "42".to_owned(),
                title: title.to_owned(),
                space: "DOCS".to_owned(),
                version: 1,
                content: String::new(),
                parent_id: None,
            },
            action,
            attachments: Vec::new(),
            failed_attachments: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts_actions() {
        let run = PublishRun {
            pages: vec![
                published("Root", PageAction::Created),
                published("Child", PageAction::Recovered),
            ],
        };

        assert_eq!(
            summary(&run),
            "Published 2 page(s): 1 created, 0 updated, 1 recovered"
        );
    }
}
