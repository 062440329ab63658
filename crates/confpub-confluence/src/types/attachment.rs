//! Confluence attachment types.

use serde::Deserialize;

/// Confluence attachment.
///
/// Only includes fields that are actually used.
/// Serde ignores unknown fields from the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    /// Attachment ID.
    pub id: String,
    /// Attachment title/filename.
    pub title: String,
    /// File metadata.
    #[serde(default)]
    pub extensions: Option<AttachmentExtensions>,
}

/// Attachment file metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentExtensions {
    /// Size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Media type.
    #[serde(default)]
    pub media_type: Option<String>,
}

/// Attachments API response.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsResponse {
    /// List of attachments.
    pub results: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_attachments() {
        let json = r#"{
            "results": [
                {"id": "att1", "type": "attachment", "title": "app.js",
                 "extensions": {"mediaType": "application/javascript", "fileSize": 2048}},
                {"id": "att2", "type": "attachment", "title": "logo.png"}
            ],
            "size": 2
        }"#;

        let response: AttachmentsResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.results.len(), 2);
        assert_eq!(
            response.results[0]
                .extensions
                .as_ref()
                .and_then(|e| e.file_size),
            Some(2048)
        );
        assert!(response.results[1].extensions.is_none());
    }
}
