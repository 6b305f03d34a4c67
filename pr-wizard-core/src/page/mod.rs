// page module - queryable document, extraction cascades and page lifecycle helpers

pub mod cascade;
pub mod commits;
pub mod decode;
pub mod files;
pub mod selectors;
pub mod session;
pub mod stats;
pub mod watch;

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use crate::analysis::{build_change_set, FileChangeSet};
use crate::config::ExtractionConfig;
use crate::error::{WizardError, WizardResult};
use crate::text::normalize;

pub use cascade::{Attempt, Cascade};
pub use commits::{extract_commits, PLACEHOLDER_COMMITS, PLACEHOLDER_STRATEGY};
pub use decode::decode_html;
pub use files::extract_files;
pub use session::{is_compare_page, Navigation, PageSession};
pub use stats::extract_stats;
pub use watch::{wait_for_element, CancelReason, WaitOutcome};

/// a parsed snapshot of the host page
pub struct Page {
    html: Html,
    url: Option<String>,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// all elements matching `selector`; an invalid selector matches nothing
    pub fn select(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(selector) {
            Some(sel) => self.html.select(&sel).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, selector: &str) -> bool {
        !self.select(selector).is_empty()
    }

    /// rendered text of the body split into lines: inline markup joins into one
    /// line, block elements and `<br>` break it, scripts and styles are skipped
    pub fn text_lines(&self) -> Vec<String> {
        let root = self
            .select("body")
            .into_iter()
            .next()
            .unwrap_or_else(|| self.html.root_element());

        let mut lines = Vec::new();
        let mut current = String::new();
        collect_lines(root, &mut current, &mut lines);
        flush_line(&mut current, &mut lines);
        lines
    }
}

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

fn collect_lines(el: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next() {
                    current.push_str(first);
                }
                for part in parts {
                    flush_line(current, lines);
                    current.push_str(part);
                }
            }
            Node::Element(element) => {
                let name = element.name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    flush_line(current, lines);
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    flush_line(current, lines);
                }
                collect_lines(child_el, current, lines);
                if block {
                    flush_line(current, lines);
                }
            }
            _ => {}
        }
    }
}

fn flush_line(current: &mut String, lines: &mut Vec<String>) {
    let line = normalize(current);
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

pub(crate) fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!("invalid selector '{selector}': {e:?}");
            None
        }
    }
}

/// elements below `el` matching `selector`
pub fn select_within<'a>(el: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(selector) {
        Some(sel) => el.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// normalised text content of an element
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize(&el.text().collect::<Vec<_>>().join(" "))
}

/// everything one extraction pass produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub commits: Vec<String>,
    /// true when the commit list is the fixed placeholder
    pub placeholder_commits: bool,
    pub changes: FileChangeSet,
}

/// run all three cascades over a page
pub fn extract_page(page: &Page, limits: &ExtractionConfig) -> WizardResult<PageExtraction> {
    let attempt = extract_commits(page, limits.max_commits);
    let placeholder_commits = attempt.strategy == PLACEHOLDER_STRATEGY;
    let commits = attempt.value;

    let files = extract_files(page);
    let stats = extract_stats(page, &files);
    let changes = build_change_set(files, stats);

    if placeholder_commits && changes.is_empty() {
        return Err(WizardError::ExtractionEmpty);
    }

    tracing::debug!(
        commits = commits.len(),
        files = changes.files.len(),
        "page extraction finished"
    );

    Ok(PageExtraction {
        commits,
        placeholder_commits,
        changes,
    })
}
