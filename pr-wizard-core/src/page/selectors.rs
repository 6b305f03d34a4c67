//! Selector sets for the code-hosting compare / pull-request pages.
//!
//! The host page is versioned outside our control, so every data kind has
//! several families listed newest layout first. Extraction degrades through
//! them in order; a family that matches nothing is simply skipped.

/// commit title elements
pub const COMMIT_SELECTORS: &[&str] = &[
    "[data-testid='commit-row-item'] h4 a",
    ".js-commits-list-item .markdown-title",
    ".js-commits-list-item p.mb-1 a",
    ".TimelineItem .commit-message code a",
    ".commit-message code a",
    ".commit-title",
    "a.message",
];

/// secondary commit strategy: anchors whose href contains this
pub const COMMIT_HREF_NEEDLE: &str = "/commit/";

/// families of numeric diff-stat elements
pub const STAT_NUMBER_SELECTORS: &[&str] = &[
    "[data-testid='diffstats'] span",
    "#diffstat .color-fg-success, #diffstat .color-fg-danger",
    ".toc-diff-stats .color-fg-success, .toc-diff-stats .color-fg-danger",
    ".diffstat-summary .text-green, .diffstat-summary .text-red",
];

/// blocks whose full text carries "+N / -N" when the numbers are not tagged
pub const STAT_SUMMARY_SELECTORS: &[&str] = &[
    "[data-testid='diffstats']",
    "#diffstat",
    ".toc-diff-stats",
    ".diffstat-summary",
    "#toc",
];

/// one element per changed file
pub const FILE_CONTAINER_SELECTORS: &[&str] = &[
    "copilot-diff-entry",
    "[data-tagsearch-path]",
    ".js-file",
    ".file",
];

/// header inside a file container
pub const FILE_HEADER_SELECTORS: &[&str] = &[
    "[data-testid='file-header']",
    ".file-header",
    ".file-info",
];

/// where a filename can be read from, and how
pub struct FilenameSource {
    pub selector: &'static str,
    /// read this attribute instead of the text content
    pub attr: Option<&'static str>,
}

pub const FILENAME_SOURCES: &[FilenameSource] = &[
    FilenameSource { selector: "[data-path]", attr: Some("data-path") },
    FilenameSource { selector: "[data-tagsearch-path]", attr: Some("data-tagsearch-path") },
    FilenameSource { selector: ".file-info a[title]", attr: Some("title") },
    FilenameSource { selector: ".file-header a[title]", attr: Some("title") },
    FilenameSource { selector: ".file-info a", attr: None },
    FilenameSource { selector: ".Truncate a", attr: None },
];

/// per-file "N additions & M deletions" carriers
pub const FILE_DIFFSTAT_SELECTORS: &[&str] = &[".diffstat[aria-label]", "[aria-label*='addition']"];

/// code cells of the rendered diff
pub const DIFF_LINE_SELECTORS: &[&str] = &["td.blob-code", ".diff-text-cell", "td[data-line-type]"];

/// sibling cells that carry a line number
pub const LINE_NUMBER_ATTRS: &[&str] = &["data-line-number", "data-line"];
