//! Confluence REST API client.
//!
//! Provides sync HTTP client for Confluence REST API with OAuth 1.0 RSA-SHA1
//! or basic authentication.

mod attachments;
mod pages;

use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::{Response, Uri};

use confpub_config::{AuthMode, ConfluenceConfig};

use crate::auth::Auth;
use crate::error::ConfluenceError;
use crate::oauth::OAuth1Auth;
use crate::oauth::key::load_private_key_from_file;

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    auth: Auth,
}

impl ConfluenceClient {
    /// Create client from config values.
    ///
    /// OAuth is used unless a username is configured, in which case the access
    /// token is sent as an API token with basic auth.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::RsaKey`] if the private key file cannot be loaded.
    pub fn from_config(config: &ConfluenceConfig) -> Result<Self, ConfluenceError> {
        let auth = match (config.auth_mode(), &config.username) {
            (AuthMode::Basic, Some(username)) => Auth::basic(username, &config.access_token),
            _ => {
                let private_key = load_private_key_from_file(&config.key_file)?;
                Auth::OAuth(OAuth1Auth::new(
                    &config.consumer_key,
                    private_key,
                    &config.access_token,
                ))
            }
        };

        Ok(Self::new(
            &config.base_url,
            auth,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn new(base_url: &str, auth: Auth, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth,
        }
    }

    /// Server base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }

    /// Authorization header for a request.
    fn authorize(&self, method: &str, url: &str) -> Result<String, ConfluenceError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| ConfluenceError::InvalidUrl(url.to_owned()))?;
        Ok(self.auth.header(method, &uri))
    }
}

/// Turn an error status into [`ConfluenceError::HttpResponse`].
fn check_status(response: Response<ureq::Body>) -> Result<Response<ureq::Body>, ConfluenceError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    let error_body = response
        .into_body()
        .read_to_string()
        .unwrap_or_else(|_| "(unable to read error body)".to_owned());
    Err(ConfluenceError::HttpResponse {
        status,
        body: error_body,
    })
}

/// Read the JSON body of a successful response.
fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T, ConfluenceError> {
    let mut body = check_status(response)?.into_body();
    Ok(body.read_json()?)
}
