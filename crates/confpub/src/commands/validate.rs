//! `confpub validate` command implementation.

use std::path::PathBuf;

use clap::Args;
use confpub_config::{AuthMode, Config, PageSpec};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the validate command.
#[derive(Args)]
pub(crate) struct ValidateArgs {
    /// Path to configuration file (default: auto-discover confpub.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ValidateArgs {
    /// Execute the validate command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), None)?;
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        match &config.confluence {
            Some(conf) => {
                conf.validate()?;
                let auth = match conf.auth_mode() {
                    AuthMode::OAuth => "OAuth",
                    AuthMode::Basic => "basic auth",
                };
                output.info(&format!("Confluence: {} ({auth})", conf.base_url));
            }
            None => output.warning("No [confluence] section: only --dry-run is available"),
        }

        output.highlight("\nPages:");
        for line in tree_lines(&config.pages) {
            output.info(&line);
        }
        output.success("\nConfiguration is valid.");
        Ok(())
    }
}

/// Effective page tree, one indented line per page.
fn tree_lines(pages: &[PageSpec]) -> Vec<String> {
    fn walk(pages: &[PageSpec], parent: Option<&PageSpec>, depth: usize, out: &mut Vec<String>) {
        for page in pages {
            let spec = page.effective(parent);
            out.push(format!("{}- {}", "  ".repeat(depth + 1), describe(&spec)));
            walk(&page.children, Some(&spec), depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(pages, None, 0, &mut out);
    out
}

fn describe(spec: &PageSpec) -> String {
    let mut line = spec.label();
    if let Some(template) = &spec.template {
        line.push_str(&format!(" [template: {}]", template.display()));
    }
    if let Some(app) = spec.macro_template() {
        line.push_str(&format!(" [app: {}]", app.display()));
        if let Some(build_dir) = &spec.build_dir {
            let set = spec.attachment_set();
            line.push_str(&format!(
                " [attachments: {} include {}",
                build_dir.display(),
                set.include.join(", ")
            ));
            if !set.exclude.is_empty() {
                line.push_str(&format!(" exclude {}", set.exclude.join(", ")));
            }
            line.push(']');
        }
    }
    line
}
