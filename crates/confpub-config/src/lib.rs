//! Configuration management for confpub.
//!
//! Parses `confpub.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.base_url`
//! - `confluence.access_token`
//! - `confluence.access_secret`
//! - `confluence.consumer_key`
//! - `confluence.username`
//! - `publish.attachment_base_url`
//!
//! ## Page Tree
//!
//! Pages are declared as `[[pages]]` tables with nested `[[pages.children]]`.
//! See [`PageSpec`] for the inheritance rules. Relative template, build and key
//! paths resolve against the directory of the config file.

mod expand;
mod page;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use page::{AttachmentSet, PageSpec, flatten};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the dry-run output directory.
    pub dry_run_dir: Option<PathBuf>,
    /// Override the attachment base URL.
    pub attachment_base_url: Option<String>,
    /// Override the OAuth private key file.
    pub key_file: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "confpub.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Confluence connection (required for real publishing only).
    pub confluence: Option<ConfluenceConfig>,
    /// Publishing behaviour.
    pub publish: PublishConfig,
    /// Dry-run configuration (paths are relative strings from TOML).
    dry_run: DryRunConfigRaw,
    /// Declared page tree.
    pub pages: Vec<PageSpec>,

    /// Resolved dry-run configuration (set after loading).
    #[serde(skip)]
    pub dry_run_resolved: DryRunConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Confluence connection configuration.
///
/// Authentication is OAuth 1.0 RSA-SHA1 unless `username` is set, in which case
/// `access_token` is sent as an API token with basic auth.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence server base URL.
    pub base_url: String,
    /// OAuth access token, or API token for basic auth.
    pub access_token: String,
    /// OAuth access token secret.
    #[serde(default)]
    pub access_secret: String,
    /// OAuth consumer key.
    #[serde(default = "default_consumer_key")]
    pub consumer_key: String,
    /// Path to the OAuth RSA private key (PEM).
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
    /// Username for basic auth.
    #[serde(default)]
    pub username: Option<String>,
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Authentication scheme selected by [`ConfluenceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// OAuth 1.0 RSA-SHA1.
    OAuth,
    /// Basic auth with username and API token.
    Basic,
}

impl ConfluenceConfig {
    /// Authentication scheme in use.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        if self.username.is_some() {
            AuthMode::Basic
        } else {
            AuthMode::OAuth
        }
    }

    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "confluence.base_url")?;
        require_http_url(&self.base_url, "confluence.base_url")?;
        require_non_empty(&self.access_token, "confluence.access_token")?;
        match &self.username {
            Some(username) => require_non_empty(username, "confluence.username")?,
            None => require_non_empty(&self.consumer_key, "confluence.consumer_key")?,
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "confluence.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_consumer_key() -> String {
    "confpub".to_owned()
}

fn default_key_file() -> PathBuf {
    PathBuf::from("private_key.pem")
}

fn default_timeout_secs() -> u64 {
    30
}

/// Publishing behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Prefix of attachment download URLs (`{prefix}/{page_id}/{filename}`).
    ///
    /// Defaults to `{confluence.base_url}/download/attachments`.
    pub attachment_base_url: Option<String>,
    /// Attempts per backend call on transport failures.
    pub retry_attempts: u32,
    /// Initial backoff between attempts, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            attachment_base_url: None,
            retry_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// Raw dry-run configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DryRunConfigRaw {
    output_dir: Option<String>,
}

/// Resolved dry-run configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DryRunConfig {
    /// Root directory of the simulated backend.
    pub output_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.access_token`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `confpub.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if no config file is found, parsing fails or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::discover_config().ok_or_else(|| {
                let cwd = std::env::current_dir().unwrap_or_default();
                ConfigError::NotFound(cwd.join(CONFIG_FILENAME))
            })?,
        };
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let mut config = Self::load_from_file(&path)?;

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Parse configuration from TOML text, resolving paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;
        config.resolve_paths(base);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.dry_run_dir {
            self.dry_run_resolved.output_dir.clone_from(dir);
        }
        if let Some(url) = &settings.attachment_base_url {
            self.publish.attachment_base_url = Some(url.clone());
        }
        if let Some(key_file) = &settings.key_file
            && let Some(confluence) = &mut self.confluence
        {
            confluence.key_file.clone_from(key_file);
        }
    }

    /// Get validated Confluence configuration.
    ///
    /// Returns the Confluence config if the `[confluence]` section is present
    /// and all fields are valid. Use this instead of accessing the `confluence`
    /// field directly when the command talks to Confluence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or invalid.
    pub fn require_confluence(&self) -> Result<&ConfluenceConfig, ConfigError> {
        let conf = self.confluence.as_ref().ok_or_else(|| {
            ConfigError::Validation("[confluence] section required in config".into())
        })?;
        conf.validate()?;
        Ok(conf)
    }

    /// Prefix of attachment download URLs.
    ///
    /// Explicit `publish.attachment_base_url` wins, then the Confluence default,
    /// then a relative `download/attachments` for configs without Confluence.
    #[must_use]
    pub fn attachment_base_url(&self) -> String {
        if let Some(url) = &self.publish.attachment_base_url {
            return url.trim_end_matches('/').to_owned();
        }
        match &self.confluence {
            Some(conf) => format!(
                "{}/download/attachments",
                conf.base_url.trim_end_matches('/')
            ),
            None => "download/attachments".to_owned(),
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            confluence: None,
            publish: PublishConfig::default(),
            dry_run: DryRunConfigRaw::default(),
            pages: Vec::new(),
            dry_run_resolved: DryRunConfig {
                output_dir: base.join(".confpub").join("dry-run"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading. Confluence settings are validated
    /// separately by [`require_confluence`](Self::require_confluence), since a
    /// dry run does not need them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_publish()?;
        validate_pages(&self.pages)?;
        Ok(())
    }

    /// Validate publish configuration.
    fn validate_publish(&self) -> Result<(), ConfigError> {
        if self.publish.retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "publish.retry_attempts must be at least 1".to_owned(),
            ));
        }
        if let Some(url) = &self.publish.attachment_base_url {
            require_non_empty(url, "publish.attachment_base_url")?;
        }
        Ok(())
    }


    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut confluence) = self.confluence {
            confluence.base_url = expand::expand_env(&confluence.base_url, "confluence.base_url")?;
            confluence.access_token =
                expand::expand_env(&confluence.access_token, "confluence.access_token")?;
            confluence.access_secret =
                expand::expand_env(&confluence.access_secret, "confluence.access_secret")?;
            confluence.consumer_key =
                expand::expand_env(&confluence.consumer_key, "confluence.consumer_key")?;
            if let Some(ref username) = confluence.username {
                confluence.username = Some(expand::expand_env(username, "confluence.username")?);
            }
        }

        if let Some(ref url) = self.publish.attachment_base_url {
            self.publish.attachment_base_url =
                Some(expand::expand_env(url, "publish.attachment_base_url")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.dry_run_resolved = DryRunConfig {
            output_dir: config_dir.join(
                self.dry_run
                    .output_dir
                    .as_deref()
                    .unwrap_or(".confpub/dry-run"),
            ),
        };

        if let Some(ref mut confluence) = self.confluence {
            confluence.key_file = config_dir.join(&confluence.key_file);
        }

        resolve_page_paths(&mut self.pages, config_dir);
    }
}

fn resolve_page_paths(pages: &mut [PageSpec], config_dir: &Path) {
    for page in pages {
        // An empty macro_template switches inheritance off and must stay empty
        if let Some(template) = &mut page.template {
            *template = config_dir.join(&*template);
        }
        if let Some(template) = &mut page.macro_template
            && !template.as_os_str().is_empty()
        {
            *template = config_dir.join(&*template);
        }
        if let Some(dir) = &mut page.build_dir {
            *dir = config_dir.join(&*dir);
        }
        resolve_page_paths(&mut page.children, config_dir);
    }
}

/// Validate a page tree with inheritance applied.
///
/// Every effective page needs a title, a space and a template; `(space, title)`
/// pairs are unique across the tree; attachment globs must compile; only
/// top-level pages may declare `parent_title`.
///
/// # Errors
///
/// Returns `ConfigError::Validation` naming the first offending field.
pub fn validate_pages(pages: &[PageSpec]) -> Result<(), ConfigError> {
    if pages.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[pages]] entry is required".to_owned(),
        ));
    }

    let mut seen = HashSet::new();
    validate_page_list(pages, None, "pages", &mut seen)
}

fn validate_page_list(
    pages: &[PageSpec],
    parent: Option<&PageSpec>,
    field: &str,
    seen: &mut HashSet<(String, String)>,
) -> Result<(), ConfigError> {
    for (index, page) in pages.iter().enumerate() {
        let field = format!("{field}[{index}]");
        let effective = page.effective(parent);

        require_non_empty(&effective.title, &format!("{field}.title"))?;
        let space = effective.space().unwrap_or_default();
        require_non_empty(space, &format!("{field}.space"))?;
        if effective.template.is_none() {
            return Err(ConfigError::Validation(format!(
                "{field}.template is required (set it here or on an ancestor)"
            )));
        }
        if parent.is_some() && page.parent_title.is_some() {
            return Err(ConfigError::Validation(format!(
                "{field}.parent_title is only allowed on top-level pages"
            )));
        }

        let set = effective.attachment_set();
        for pattern in set.include.iter().chain(&set.exclude) {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "{field}.attachments: invalid pattern {pattern:?}: {e}"
                ))
            })?;
        }

        if !seen.insert((space.to_owned(), effective.title.clone())) {
            return Err(ConfigError::Validation(format!(
                "{field}: duplicate page \"{}\" in space {space}",
                effective.title
            )));
        }

        validate_page_list(
            &page.children,
            Some(&effective),
            &format!("{field}.children"),
            seen,
        )?;
    }
    Ok(())
}
