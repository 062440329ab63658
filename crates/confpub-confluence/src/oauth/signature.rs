//! OAuth 1.0 signature generation (RFC 5849).

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use rand::RngExt;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;

/// OAuth unreserved characters: A-Z a-z 0-9 - . _ ~
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode string per RFC 3986.
pub(crate) fn oauth_encode(input: &str) -> String {
    percent_encode(input.as_bytes(), OAUTH_ENCODE_SET).to_string()
}

/// Generate cryptographically random nonce (32 hex characters).
fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Generate Unix timestamp.
fn generate_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Sign data with RSA-SHA1 and return base64-encoded signature.
fn sign_rsa_sha1(private_key: &RsaPrivateKey, data: &str) -> String {
    let signing_key = SigningKey::<Sha1>::new(private_key.clone());
    let signature = signing_key.sign(data.as_bytes());
    BASE64_STANDARD.encode(signature.to_bytes())
}

/// Build OAuth signature base string per RFC 5849 Section 3.4.1.
///
/// Format: `HTTP_METHOD&encoded_base_url&encoded_parameters`
fn build_signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    // Normalize parameters: encode keys/values, sort by encoded key then value
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (oauth_encode(k), oauth_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        oauth_encode(base_url),
        oauth_encode(&param_string)
    )
}

/// Build OAuth Authorization header from OAuth params.
fn build_authorization_header(oauth_params: &BTreeMap<&str, String>) -> String {
    let header_parts: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", oauth_encode(v)))
        .collect();
    format!("OAuth {}", header_parts.join(", "))
}

/// Create OAuth Authorization header value.
///
/// # Arguments
/// * `method` - HTTP method (GET, POST, etc.)
/// * `base_url` - URL without query string (<scheme://host/path>)
/// * `query_params` - Decoded query parameters to include in signature
/// * `consumer_key` - OAuth consumer key
/// * `access_token` - OAuth access token
/// * `private_key` - RSA private key for signing
pub(crate) fn create_authorization_header(
    method: &str,
    base_url: &str,
    query_params: &[(String, String)],
    consumer_key: &str,
    access_token: &str,
    private_key: &RsaPrivateKey,
) -> String {
    let mut oauth_params = BTreeMap::new();
    oauth_params.insert("oauth_consumer_key", consumer_key.to_owned());
    oauth_params.insert("oauth_nonce", generate_nonce());
    oauth_params.insert("oauth_signature_method", "RSA-SHA1".to_owned());
    oauth_params.insert("oauth_timestamp", generate_timestamp());
    oauth_params.insert("oauth_token", access_token.to_owned());
    oauth_params.insert("oauth_version", "1.0".to_owned());

    // Build signature params: OAuth params + query params (RFC 5849 Section 3.4.1.3)
    let signature_params: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .chain(query_params.iter().cloned())
        .collect();

    let base_string = build_signature_base_string(method, base_url, &signature_params);
    let signature = sign_rsa_sha1(private_key, &base_string);
    oauth_params.insert("oauth_signature", signature);

    build_authorization_header(&oauth_params)
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::signature::Verifier;

    use super::*;
    use crate::oauth::key::tests::TEST_PKCS8_KEY;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::from_pkcs8_pem(TEST_PKCS8_KEY).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_oauth_encode_unreserved() {
        // Unreserved characters should not be encoded
        assert_eq!(oauth_encode("abc123"), "abc123");
        assert_eq!(oauth_encode("ABC"), "ABC");
        assert_eq!(oauth_encode("-._~"), "-._~");
    }

    #[test]
    fn test_oauth_encode_reserved() {
        assert_eq!(oauth_encode(" "), "%20");
        assert_eq!(oauth_encode("&"), "%26");
        assert_eq!(oauth_encode("="), "%3D");
        assert_eq!(oauth_encode("/"), "%2F");
    }

    #[test]
    fn test_nonce_uniqueness() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();
        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), 32);
    }

    #[test]
    fn test_signature_base_string_sorts_and_encodes() {
        let base = build_signature_base_string(
            "get",
            "https://example.com/rest/api/content",
            &params(&[("title", "Getting Started"), ("spaceKey", "DOCS")]),
        );

        assert_eq!(
            base,
            "GET&https%3A%2F%2Fexample.com%2Frest%2Fapi%2Fcontent&spaceKey%3DDOCS%26title%3DGetting%2520Started"
        );
    }

    #[test]
    fn test_authorization_header_fields() {
        let header = create_authorization_header(
            "GET",
            "https://example.com/rest/api/content",
            &[],
            "confpub",
            "token",
            &test_key(),
        );

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"confpub\"",
            "oauth_signature_method=\"RSA-SHA1\"",
            "oauth_token=\"token\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(header.contains(field), "missing {field} in {header}");
        }
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let key = test_key();
        let base = "GET&https%3A%2F%2Fexample.com&a%3D1";

        let encoded = sign_rsa_sha1(&key, base);

        let bytes = BASE64_STANDARD.decode(encoded).unwrap();
        let signature = Signature::try_from(bytes.as_slice()).unwrap();
        let verifying_key = VerifyingKey::<Sha1>::new(key.to_public_key());
        assert!(verifying_key.verify(base.as_bytes(), &signature).is_ok());
    }
}
