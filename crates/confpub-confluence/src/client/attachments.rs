//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::{debug, info};

use super::{ConfluenceClient, read_json};
use crate::error::ConfluenceError;
use crate::oauth::oauth_encode;
use crate::types::{Attachment, AttachmentsResponse};

/// Page size for attachment listings.
const PAGE_LIMIT: usize = 100;

impl ConfluenceClient {
    /// Upload or update attachment (upsert by filename).
    pub(crate) fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<Attachment, ConfluenceError> {
        // Check if attachment already exists
        let existing = self.find_attachment_by_name(page_id, filename)?;

        let url = if let Some(ref att) = existing {
            info!(page_id, filename, attachment_id = %att.id, "Updating existing attachment");
            format!(
                "{}/content/{page_id}/child/attachment/{}/data",
                self.api_url(),
                att.id
            )
        } else {
            info!(page_id, filename, "Uploading new attachment");
            format!("{}/content/{page_id}/child/attachment", self.api_url())
        };

        let auth_header = self.authorize("POST", &url)?;
        let boundary = format!("----ConfpubFormBoundary{:016x}", rand::rng().random::<u64>());
        let body = multipart_body(&boundary, filename, guess_content_type(filename), data);

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        // Response is a list for new uploads, single object for updates
        if existing.is_some() {
            read_json(response)
        } else {
            let response: AttachmentsResponse = read_json(response)?;
            response.results.into_iter().next().ok_or_else(|| {
                ConfluenceError::UnexpectedResponse("empty attachment response".to_owned())
            })
        }
    }

    /// List all attachments on a page.
    pub(crate) fn get_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, ConfluenceError> {
        let mut attachments = Vec::new();

        loop {
            let url = format!(
                "{}/content/{page_id}/child/attachment?start={}&limit={PAGE_LIMIT}",
                self.api_url(),
                attachments.len()
            );
            let batch = self.fetch_attachments(&url)?;
            let done = batch.results.len() < PAGE_LIMIT;
            attachments.extend(batch.results);
            if done {
                break;
            }
        }

        debug!(page_id, count = attachments.len(), "Listed attachments");
        Ok(attachments)
    }

    /// Find attachment by filename on a page.
    fn find_attachment_by_name(
        &self,
        page_id: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        let url = format!(
            "{}/content/{page_id}/child/attachment?filename={}",
            self.api_url(),
            oauth_encode(filename)
        );
        let attachments = self.fetch_attachments(&url)?;
        Ok(attachments
            .results
            .into_iter()
            .find(|a| a.title == filename))
    }

    fn fetch_attachments(&self, url: &str) -> Result<AttachmentsResponse, ConfluenceError> {
        let auth_header = self.authorize("GET", url)?;
        let response = self
            .agent
            .get(url)
            .header("Authorization", &auth_header)
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }
}

/// Build a `multipart/form-data` body with a single `file` part.
fn multipart_body(boundary: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let filename = filename.replace('"', "%22");
    let mut body = Vec::with_capacity(data.len() + 256);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    // Uploads replace content without notifying watchers
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"minorEdit\"\r\n\r\ntrue\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Media type for an attachment filename.
pub(crate) fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("app.js"), "application/javascript");
        assert_eq!(guess_content_type("styles/app.CSS"), "text/css; charset=utf-8");
        assert_eq!(guess_content_type("logo.png"), "image/png");
        assert_eq!(guess_content_type("font.woff2"), "font/woff2");
    }

    #[test]
    fn test_guess_content_type_unknown() {
        assert_eq!(guess_content_type("file.xyz"), "application/octet-stream");
        assert_eq!(guess_content_type("Makefile"), "application/octet-stream");
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("BOUNDARY", "app.js", "application/javascript", b"let x;");
        let text = String::from_utf8(body).unwrap();

        assert_eq!(
            text,
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"app.js\"\r\n\
             Content-Type: application/javascript\r\n\r\n\
             let x;\r\n\
             --BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"minorEdit\"\r\n\r\n\
             true\r\n\
             --BOUNDARY--\r\n"
        );
    }

    #[test]
    fn test_multipart_body_escapes_quotes() {
        let body = multipart_body("B", "a\"b.txt", "text/plain", b"");
        let text = String::from_utf8(body).unwrap();

        assert!(text.contains("filename=\"a%22b.txt\""));
    }
}
