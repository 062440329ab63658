//! On-disk page records.
//!
//! Each page directory holds:
//!
//! ```text
//! {page-dir}/
//! ├── metadata.json
//! ├── content.html
//! └── attachments/
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use confpub_backend::{BackendError, BackendErrorKind, RemotePage};

use crate::BACKEND;

/// Metadata file name inside a page directory.
pub(crate) const METADATA_FILE: &str = "metadata.json";
/// Content file name inside a page directory.
pub(crate) const CONTENT_FILE: &str = "content.html";
/// Attachment directory name inside a page directory.
pub(crate) const ATTACHMENTS_DIR: &str = "attachments";

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PageRecord {
    pub id: String,
    pub title: String,
    pub space: String,
    pub parent_id: Option<String>,
    pub version: u32,
    /// Attachment filename to path relative to the page directory.
    #[serde(default)]
    pub attachments: BTreeMap<String, String>,
}

impl PageRecord {
    /// Read the record stored in `dir`.
    pub(crate) fn read(dir: &Path) -> Result<Self, BackendError> {
        let path = dir.join(METADATA_FILE);
        let text = fs::read_to_string(&path).map_err(|e| io_error(e, &path))?;
        serde_json::from_str(&text).map_err(|e| {
            BackendError::new(BackendErrorKind::Other)
                .with_backend(BACKEND)
                .with_target(path.display().to_string())
                .with_message("invalid metadata record")
                .with_source(e)
        })
    }

    /// Write the record into `dir`.
    pub(crate) fn write(&self, dir: &Path) -> Result<(), BackendError> {
        let path = dir.join(METADATA_FILE);
        let text = serde_json::to_string_pretty(self).map_err(|e| {
            BackendError::new(BackendErrorKind::Other)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        fs::write(&path, text).map_err(|e| io_error(e, &path))
    }

    /// Assemble the backend view, reading `content.html` from `dir`.
    pub(crate) fn to_page(&self, dir: &Path) -> Result<RemotePage, BackendError> {
        let path = dir.join(CONTENT_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(io_error(e, &path)),
        };
        Ok(RemotePage {
            id: self.id.clone(),
            title: self.title.clone(),
            space: self.space.clone(),
            version: self.version,
            content,
            parent_id: self.parent_id.clone(),
        })
    }
}

/// Write page content into `dir`.
pub(crate) fn write_content(dir: &Path, content: &str) -> Result<(), BackendError> {
    let path = dir.join(CONTENT_FILE);
    fs::write(&path, content).map_err(|e| io_error(e, &path))
}

/// Map an I/O error on `path` to a backend error.
pub(crate) fn io_error(err: std::io::Error, path: &Path) -> BackendError {
    BackendError::io(err, Some(path.display().to_string())).with_backend(BACKEND)
}

/// Directory name for a page title.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; every other run of characters
/// becomes a single `_`. Empty or dot-only results fall back to `untitled`.
pub(crate) fn sanitize_title(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut pending_sep = false;
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            if pending_sep && !result.is_empty() {
                result.push('_');
            }
            pending_sep = false;
            result.push(c);
        } else {
            pending_sep = true;
        }
    }

    if result.chars().all(|c| c == '.') {
        return "untitled".to_owned();
    }
    result
}

/// Recursively collect page directories (those holding `metadata.json`) under `root`.
///
/// Unreadable directories are skipped.
pub(crate) fn walk_page_dirs(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        if dir.join(METADATA_FILE).is_file() {
            found.push(dir.clone());
        }
        for entry in entries.flatten() {
            let path = entry.path();
            let is_attachments = path.file_name().is_some_and(|n| n == ATTACHMENTS_DIR)
                && dir.join(METADATA_FILE).is_file();
            if path.is_dir() && !is_attachments {
                stack.push(path);
            }
        }
    }

    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Getting Started"), "Getting_Started");
        assert_eq!(sanitize_title("  API / v2: Reference  "), "API_v2_Reference");
        assert_eq!(sanitize_title("release-1.2_notes"), "release-1.2_notes");
        assert_eq!(sanitize_title("Ünïcode Title"), "n_code_Title");
    }

    #[test]
    fn test_sanitize_title_fallback() {
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("///"), "untitled");
        assert_eq!(sanitize_title(".."), "untitled");
    }

    #[test]
    fn test_record_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let record = PageRecord {
            id: "abc".to_owned(),
            title: "Home".to_owned(),
            space: "DOCS".to_owned(),
            parent_id: None,
            version: 3,
            attachments: BTreeMap::from([("app.js".to_owned(), "attachments/app.js".to_owned())]),
        };

        record.write(dir.path()).unwrap();
        write_content(dir.path(), "<p>hi</p>").unwrap();

        assert_eq!(PageRecord::read(dir.path()).unwrap(), record);
        let page = record.to_page(dir.path()).unwrap();
        assert_eq!(page.content, "<p>hi</p>");
        assert_eq!(page.version, 3);
    }

    #[test]
    fn test_read_invalid_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE), "not json").unwrap();

        let err = PageRecord::read(dir.path()).unwrap_err();

        assert!(err.is(BackendErrorKind::Other));
        assert!(err.to_string().contains("invalid metadata record"));
    }

    #[test]
    fn test_walk_skips_attachment_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("DOCS").join("Root");
        let child = root.join("Child");
        let assets = root.join(ATTACHMENTS_DIR).join("nested");
        fs::create_dir_all(&child).unwrap();
        fs::create_dir_all(&assets).unwrap();
        fs::write(root.join(METADATA_FILE), "{}").unwrap();
        fs::write(child.join(METADATA_FILE), "{}").unwrap();
        fs::write(assets.join(METADATA_FILE), "{}").unwrap();

        let found = walk_page_dirs(&dir.path().join("DOCS"));

        assert_eq!(found, vec![root, child]);
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = tempfile::tempdir().unwrap();

        assert!(walk_page_dirs(&dir.path().join("missing")).is_empty());
    }
}
