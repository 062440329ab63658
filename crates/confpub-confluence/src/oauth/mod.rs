//! OAuth 1.0 RSA-SHA1 authentication for Confluence.
//!
//! Confluence Server/Data Center application links sign every request with
//! the consumer's RSA key.

pub(crate) mod key;
mod signature;

pub(crate) use signature::oauth_encode;

use percent_encoding::percent_decode_str;
use rsa::RsaPrivateKey;
use ureq::http::Uri;

use signature::create_authorization_header;

/// OAuth 1.0 RSA-SHA1 credentials.
pub(crate) struct OAuth1Auth {
    consumer_key: String,
    private_key: RsaPrivateKey,
    access_token: String,
}

impl OAuth1Auth {
    /// Create auth instance with pre-loaded private key.
    pub(crate) fn new(consumer_key: &str, private_key: RsaPrivateKey, access_token: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_owned(),
            private_key,
            access_token: access_token.to_owned(),
        }
    }

    /// Sign an HTTP request and return the Authorization header value.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, PUT, etc.)
    /// * `uri` - Full request URI (including query string)
    pub(crate) fn sign(&self, method: &str, uri: &Uri) -> String {
        // Base URL excludes query string (RFC 5849 Section 3.4.1.2)
        let base_url = format!(
            "{}://{}{}",
            uri.scheme_str().unwrap_or("https"),
            uri.authority().map_or("", |a| a.as_str()),
            uri.path()
        );

        create_authorization_header(
            method,
            &base_url,
            &query_params(uri),
            &self.consumer_key,
            &self.access_token,
            &self.private_key,
        )
    }
}

/// Decoded query parameters of a URI (RFC 5849 Section 3.4.1.3).
fn query_params(uri: &Uri) -> Vec<(String, String)> {
    let decode = |s: &str| percent_decode_str(s).decode_utf8_lossy().into_owned();
    uri.query()
        .map(|q| {
            q.split('&')
                .filter(|param| !param.is_empty())
                .map(|param| {
                    let (key, value) = param.split_once('=').unwrap_or((param, ""));
                    (decode(key), decode(value))
                })
                .collect()
        })
        .unwrap_or_default()
}
