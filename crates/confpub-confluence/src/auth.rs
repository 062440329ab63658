//! Request authentication.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use ureq::http::Uri;

use crate::oauth::OAuth1Auth;

/// Authentication scheme of a [`ConfluenceClient`](crate::ConfluenceClient).
pub(crate) enum Auth {
    /// OAuth 1.0 RSA-SHA1 (Server/Data Center application links).
    OAuth(OAuth1Auth),
    /// Basic auth with username and API token.
    Basic {
        /// Precomputed header value.
        header: String,
    },
}

impl Auth {
    /// Basic auth credentials.
    pub(crate) fn basic(username: &str, token: &str) -> Self {
        let encoded = BASE64_STANDARD.encode(format!("{username}:{token}"));
        Self::Basic {
            header: format!("Basic {encoded}"),
        }
    }

    /// Authorization header value for a request.
    pub(crate) fn header(&self, method: &str, uri: &Uri) -> String {
        match self {
            Self::OAuth(oauth) => oauth.sign(method, uri),
            Self::Basic { header } => header.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let auth = Auth::basic("me@example.com", "secret");
        let uri: Uri = "https://example.com/rest/api/content".parse().unwrap();

        assert_eq!(
            auth.header("GET", &uri),
            "Basic bWVAZXhhbXBsZS5jb206c2VjcmV0"
        );
    }
}
