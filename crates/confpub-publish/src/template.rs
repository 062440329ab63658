//! Template-file renderer.
//!
//! Renders a page's `template` with minijinja. When the page declares a
//! `macro_template`, that template is rendered first with the same context and
//! exposed to the page template as `macro_html`:
//!
//! ```text
//! <ac:structured-macro ac:name="html">
//!   <ac:plain-text-body><![CDATA[{{ macro_html }}]]></ac:plain-text-body>
//! </ac:structured-macro>
//! ```
//!
//! Templates see every [`RenderContext`] field, for example
//! `{{ attachments["app.js"] }}`.

use std::path::Path;

use minijinja::Environment;
use serde::Serialize;

use confpub_config::PageSpec;

use crate::renderer::{ContentRenderer, RenderContext, RenderError};

/// [`ContentRenderer`] over template files.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer.
    ///
    /// Undefined values render as empty strings, so a first render before
    /// attachment URLs are known still succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    fn render_file(
        &self,
        path: &Path,
        context: &RenderContext,
        macro_html: Option<&str>,
    ) -> Result<String, RenderError> {
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let vars = TemplateVars {
            context,
            macro_html,
        };
        self.env
            .render_str(&source, vars)
            .map_err(|source| RenderError::Template {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[derive(Serialize)]
struct TemplateVars<'a> {
    #[serde(flatten)]
    context: &'a RenderContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    macro_html: Option<&'a str>,
}

impl ContentRenderer for TemplateRenderer {
    fn render(&self, spec: &PageSpec, context: &RenderContext) -> Result<String, RenderError> {
        let template = spec
            .template
            .as_deref()
            .ok_or_else(|| RenderError::MissingTemplate(spec.label()))?;

        let macro_html = spec
            .macro_template()
            .map(|path| self.render_file(path, context, None))
            .transpose()?;

        self.render_file(template, context, macro_html.as_deref())
    }
}
