//! Build-output scanning for page attachments.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use confpub_config::AttachmentSet;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    /// Attachment filename (the file's base name).
    pub filename: String,
    /// Path on disk.
    pub path: PathBuf,
}

/// Error scanning a build directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Directory could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Glob pattern failed to compile.
    #[error("invalid pattern {pattern:?}")]
    Pattern {
        /// The pattern text.
        pattern: String,
        /// Compilation error.
        #[source]
        source: glob::PatternError,
    },
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, ScanError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| ScanError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Select files under `build_dir` matching `set`.
///
/// Patterns match paths relative to `build_dir` with `/` separators. Attachments
/// are flat per page, so when two files share a base name only the first one
/// (in path order) is kept.
pub fn scan_attachments(build_dir: &Path, set: &AttachmentSet) -> Result<Vec<AttachmentFile>, ScanError> {
    let include = compile(&set.include)?;
    let exclude = compile(&set.exclude)?;
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut relative_paths = Vec::new();
    collect_files(build_dir, build_dir, &mut relative_paths)?;
    relative_paths.sort();

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for relative in relative_paths {
        let included = include.iter().any(|p| p.matches_with(&relative, options));
        let excluded = exclude.iter().any(|p| p.matches_with(&relative, options));
        if !included || excluded {
            continue;
        }

        let filename = relative.rsplit('/').next().unwrap_or(&relative).to_owned();
        if !seen.insert(filename.clone()) {
            warn!(file = %relative, "Skipping attachment with duplicate filename");
            continue;
        }
        files.push(AttachmentFile {
            path: build_dir.join(&relative),
            filename,
        });
    }

    debug!(dir = %build_dir.display(), count = files.len(), "scanned attachments");
    Ok(files)
}

/// Recursively collect `/`-separated file paths relative to `root`.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ScanError> {
    let io_error = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            out.push(parts.join("/"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn build_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in [
            "app.js",
            "app.js.map",
            "styles/app.css",
            "assets/logo.png",
            "nested/deep/app.js",
        ] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, file).unwrap();
        }
        dir
    }

    fn names(files: &[AttachmentFile]) -> Vec<&str> {
        files.iter().map(|f| f.filename.as_str()).collect()
    }

    #[test]
    fn test_default_set_selects_everything() {
        let dir = build_dir();

        let files = scan_attachments(dir.path(), &AttachmentSet::default()).unwrap();

        // nested/deep/app.js loses to app.js
        assert_eq!(names(&files), vec!["app.js", "app.js.map", "logo.png", "app.css"]);
        assert_eq!(files[0].path, dir.path().join("app.js"));
    }

    #[test]
    fn test_include_and_exclude() {
        let dir = build_dir();
        let set = AttachmentSet {
            include: vec!["**/*.js".to_owned(), "**/*.css".to_owned()],
            exclude: vec!["nested/**".to_owned()],
        };

        let files = scan_attachments(dir.path(), &set).unwrap();

        assert_eq!(names(&files), vec!["app.js", "app.css"]);
    }

    #[test]
    fn test_no_matches() {
        let dir = build_dir();
        let set = AttachmentSet {
            include: vec!["*.wasm".to_owned()],
            exclude: Vec::new(),
        };

        assert!(scan_attachments(dir.path(), &set).unwrap().is_empty());
    }

    #[test]
    fn test_missing_build_dir() {
        let dir = tempfile::tempdir().unwrap();

        let err = scan_attachments(&dir.path().join("missing"), &AttachmentSet::default())
            .unwrap_err();

        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = build_dir();
        let set = AttachmentSet {
            include: vec!["[".to_owned()],
            exclude: Vec::new(),
        };

        let err = scan_attachments(dir.path(), &set).unwrap_err();

        assert!(matches!(err, ScanError::Pattern { .. }));
    }
}
