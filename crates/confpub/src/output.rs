//! Colored terminal output on stderr.

use console::{Style, Term};

use confpub_publish::{PageAction, PublishedPage};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    fn write(&self, style: Option<&Style>, msg: &str) {
        let _ = match style {
            Some(style) => self.term.write_line(&style.apply_to(msg).to_string()),
            None => self.term.write_line(msg),
        };
    }

    /// Print a plain line.
    pub(crate) fn info(&self, msg: &str) {
        self.write(None, msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        self.write(Some(&self.green), msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.write(Some(&self.yellow), msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.write(Some(&self.red), msg);
    }

    /// Print a heading (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        self.write(Some(&self.cyan_bold), msg);
    }

    /// Print a published page: new pages green, recovered ones yellow.
    pub(crate) fn page(&self, published: &PublishedPage) {
        let style = match published.action {
            PageAction::Created => Some(&self.green),
            PageAction::Updated => None,
            PageAction::Recovered => Some(&self.yellow),
        };
        self.write(style, &page_line(published));
    }
}

/// One summary line per page: action, page, id, version and attachments.
fn page_line(published: &PublishedPage) -> String {
    let page = &published.page;
    let mut line = format!(
        "  {:<9} {} (id {}, v{})",
        published.action,
        page.label(),
        page.id,
        page.version
    );
    let uploaded = published.attachments.len();
    let failed = published.failed_attachments.len();
    if uploaded + failed > 0 {
        line.push_str(&format!(", {uploaded} attachment(s)"));
        if failed > 0 {
            line.push_str(&format!(", {failed} failed"));
        }
    }
    line
}
