//! Declared page tree.
//!
//! A [`PageSpec`] is one node of the `[[pages]]` tree in `confpub.toml`.
//!
//! # Inheritance Rules
//!
//! When a field is absent, the nearest ancestor's value applies:
//!
//! - `space`, `template`, `macro_template`, `attachments`: inherited
//! - `title`: never inherited
//! - `build_dir`: never inherited
//! - `parent_title`: never inherited; the orchestrator injects the parent's
//!   resolved title while recursing

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Glob patterns selecting attachment files from a build directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachmentSet {
    /// Patterns a file must match (relative to the build directory).
    pub include: Vec<String>,
    /// Patterns excluding otherwise included files.
    pub exclude: Vec<String>,
}

impl Default for AttachmentSet {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_owned()],
            exclude: Vec::new(),
        }
    }
}

/// A node in the declared page tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSpec {
    /// Page title, the natural key within a space.
    pub title: String,
    /// Space key.
    #[serde(alias = "space_key")]
    pub space: Option<String>,
    /// Title of the page to publish under.
    pub parent_title: Option<String>,
    /// Content template path.
    pub template: Option<PathBuf>,
    /// Embedded application template. Empty disables an inherited one.
    pub macro_template: Option<PathBuf>,
    /// Attachment selection.
    pub attachments: Option<AttachmentSet>,
    /// Directory scanned for attachment files.
    pub build_dir: Option<PathBuf>,
    /// Child pages, published in order.
    pub children: Vec<PageSpec>,
}

impl PageSpec {
    /// Create a page with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the space key.
    #[must_use]
    pub fn with_space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }

    /// Set the content template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the macro template.
    #[must_use]
    pub fn with_macro_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.macro_template = Some(template.into());
        self
    }

    /// Set the build directory.
    #[must_use]
    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    /// Set the attachment selection.
    #[must_use]
    pub fn with_attachments(mut self, attachments: AttachmentSet) -> Self {
        self.attachments = Some(attachments);
        self
    }

    /// Append a child page.
    #[must_use]
    pub fn with_child(mut self, child: PageSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Space key, if set or inherited.
    #[must_use]
    pub fn space(&self) -> Option<&str> {
        self.space.as_deref()
    }

    /// Macro template, ignoring an empty path used to switch inheritance off.
    #[must_use]
    pub fn macro_template(&self) -> Option<&Path> {
        self.macro_template
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Attachment selection, defaulting to every file.
    #[must_use]
    pub fn attachment_set(&self) -> AttachmentSet {
        self.attachments.clone().unwrap_or_default()
    }

    /// `SPACE/Title` label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.space().unwrap_or("?"), self.title)
    }

    /// Effective configuration of this node under `parent`.
    ///
    /// `parent` must itself be effective. The result has no children.
    #[must_use]
    pub fn effective(&self, parent: Option<&PageSpec>) -> PageSpec {
        // Start with child values for non-inherited fields
        let mut merged = PageSpec {
            title: self.title.clone(),                 // Never inherited
            build_dir: self.build_dir.clone(),         // Never inherited
            parent_title: self.parent_title.clone(),   // Never inherited
            space: self.space.clone(),
            template: self.template.clone(),
            macro_template: self.macro_template.clone(),
            attachments: self.attachments.clone(),
            children: Vec::new(),
        };

        if let Some(parent) = parent {
            if merged.space.is_none() {
                merged.space.clone_from(&parent.space);
            }
            if merged.template.is_none() {
                merged.template.clone_from(&parent.template);
            }
            if merged.macro_template.is_none() {
                merged.macro_template.clone_from(&parent.macro_template);
            }
            if merged.attachments.is_none() {
                merged.attachments.clone_from(&parent.attachments);
            }
        }

        merged
    }
}

/// Effective pages of a tree in publish order (depth-first, parents first).
#[must_use]
pub fn flatten(pages: &[PageSpec]) -> Vec<PageSpec> {
    fn walk(pages: &[PageSpec], parent: Option<&PageSpec>, out: &mut Vec<PageSpec>) {
        for page in pages {
            let mut effective = page.effective(parent);
            if let Some(parent) = parent {
                effective.parent_title = Some(parent.title.clone());
            }
            out.push(effective.clone());
            walk(&page.children, Some(&effective), out);
        }
    }

    let mut out = Vec::new();
    walk(pages, None, &mut out);
    out
}
