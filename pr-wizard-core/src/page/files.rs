// per-file extraction - filename, status, counts and classified diff lines

use lazy_static::lazy_static;
use regex::Regex;
use scraper::ElementRef;

use super::selectors::{
    DIFF_LINE_SELECTORS, FILENAME_SOURCES, FILE_CONTAINER_SELECTORS, FILE_DIFFSTAT_SELECTORS,
    FILE_HEADER_SELECTORS, LINE_NUMBER_ATTRS,
};
use super::{element_text, select_within, Page};
use crate::analysis::{analyse_file, clean_line, line_role, DiffLine, FileChange, FileStatus};
use crate::text::parse_count;

lazy_static! {
    static ref ADDITIONS: Regex = Regex::new(r"(?i)([\d,]+)\s+additions?").unwrap();
    static ref DELETIONS: Regex = Regex::new(r"(?i)([\d,]+)\s+deletions?").unwrap();
}

/// every changed file rendered on the page
pub fn extract_files(page: &Page) -> Vec<FileChange> {
    let containers = FILE_CONTAINER_SELECTORS
        .iter()
        .map(|selector| page.select(selector))
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let mut files: Vec<FileChange> = Vec::new();
    for container in containers {
        let header = FILE_HEADER_SELECTORS
            .iter()
            .find_map(|selector| select_within(container, selector).into_iter().next())
            .unwrap_or(container);

        let Some(filename) = filename_of(container, header) else {
            tracing::debug!("skipping file container without a recognisable filename");
            continue;
        };
        if files.iter().any(|f| f.filename == filename) {
            continue;
        }

        let status = status_from_header(&element_text(header));
        let counts = header_counts(header);
        let lines = diff_lines(container);
        files.push(analyse_file(filename, status, counts, &lines));
    }

    files
}

fn filename_of(container: ElementRef<'_>, header: ElementRef<'_>) -> Option<String> {
    let own = ["data-tagsearch-path", "data-path"]
        .iter()
        .find_map(|attr| container.value().attr(attr))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    if own.is_some() {
        return own;
    }

    let from_sources = FILENAME_SOURCES.iter().find_map(|source| {
        select_within(container, source.selector)
            .into_iter()
            .find_map(|el| {
                match source.attr {
                    Some(attr) => el
                        .value()
                        .attr(attr)
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty()),
                    None => Some(element_text(el)).filter(|t| looks_like_path(t)),
                }
            })
    });
    if from_sources.is_some() {
        return from_sources;
    }

    // last resort: first header link that looks like a path
    select_within(header, "a")
        .into_iter()
        .map(element_text)
        .find(|text| looks_like_path(text))
}

fn looks_like_path(text: &str) -> bool {
    text.contains('.') && !text.to_lowercase().contains("commit")
}

/// keyword search over the header text; anything unrecognised is a modification
pub fn status_from_header(header_text: &str) -> FileStatus {
    let text = header_text.to_lowercase();
    if text.contains("added") || text.contains("new file") {
        FileStatus::Added
    } else if text.contains("deleted") || text.contains("removed") {
        FileStatus::Deleted
    } else if text.contains("renamed") {
        FileStatus::Renamed
    } else {
        FileStatus::Modified
    }
}

fn header_counts(header: ElementRef<'_>) -> Option<(usize, usize)> {
    FILE_DIFFSTAT_SELECTORS.iter().find_map(|selector| {
        select_within(header, selector).into_iter().find_map(|el| {
            let label = el.value().attr("aria-label")?;
            let additions = count_in(&ADDITIONS, label);
            let deletions = count_in(&DELETIONS, label);
            if additions.is_none() && deletions.is_none() {
                None
            } else {
                Some((additions.unwrap_or(0), deletions.unwrap_or(0)))
            }
        })
    })
}

fn count_in(pattern: &Regex, text: &str) -> Option<usize> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_count(m.as_str()))
}

fn diff_lines(container: ElementRef<'_>) -> Vec<DiffLine> {
    let cells = DIFF_LINE_SELECTORS
        .iter()
        .map(|selector| select_within(container, selector))
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    cells
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            let raw: String = cell.text().collect();
            let classes: Vec<&str> = cell.value().classes().collect();
            let line_type = cell
                .value()
                .attr("data-line-type")
                .or_else(|| cell.value().attr("data-type"));
            DiffLine {
                role: line_role(&classes, line_type, &raw),
                text: clean_line(&raw),
                line_number: line_number_of(cell).unwrap_or(idx + 1),
            }
        })
        .collect()
}

/// the last numbered sibling cell in the row (new-side number on split views)
fn line_number_of(cell: ElementRef<'_>) -> Option<usize> {
    let row = cell.parent().and_then(ElementRef::wrap)?;
    row.children()
        .filter_map(ElementRef::wrap)
        .filter_map(|td| {
            LINE_NUMBER_ATTRS
                .iter()
                .find_map(|attr| td.value().attr(attr))
                .and_then(parse_count)
        })
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ChangeKind;

    const TWO_FILES: &str = r##"
        <div class="file js-file">
          <div class="file-header">
            <span class="file-info"><a title="api/users.js" href="#diff-1">api/users.js</a></span>
            <span class="diffstat" aria-label="3 additions &amp; 1 deletion"></span>
            <span>New file</span>
          </div>
          <table>
            <tr><td class="blob-num" data-line-number="1"></td><td class="blob-code blob-code-context"> const express = require('express');</td></tr>
            <tr><td class="blob-num" data-line-number="2"></td><td class="blob-code blob-code-addition">+function createUser(req, res) {</td></tr>
            <tr><td class="blob-num" data-line-number="3"></td><td class="blob-code blob-code-deletion">-function addUser(req, res) {</td></tr>
          </table>
        </div>
        <div class="file js-file">
          <div class="file-header">
            <span class="file-info"><a href="/o/r/commit/abc">commit abc</a> <a href="#diff-2">styles/old.css</a></span>
            <span>File deleted</span>
          </div>
        </div>"##;

    #[test]
    fn test_extracts_files_with_status_counts_and_lines() {
        let page = Page::parse(TWO_FILES);
        let files = extract_files(&page);
        assert_eq!(files.len(), 2);

        let users = &files[0];
        assert_eq!(users.filename, "api/users.js");
        assert_eq!(users.status, FileStatus::Added);
        assert_eq!((users.additions, users.deletions), (3, 1));
        assert_eq!(users.changes.len(), 1);
        let group = &users.changes[0];
        assert_eq!(group.added[0].kind, ChangeKind::Function);
        assert_eq!(group.added[0].info.as_deref(), Some("createUser"));
        assert_eq!(group.added[0].line_number, 2);
        assert_eq!(group.context[0].kind, ChangeKind::Import);

        let css = &files[1];
        assert_eq!(css.filename, "styles/old.css");
        assert_eq!(css.status, FileStatus::Deleted);
        assert!(css.changes.is_empty());
    }

    #[test]
    fn test_status_keywords() {
        assert_eq!(status_from_header("src/a.rs Renamed from src/b.rs"), FileStatus::Renamed);
        assert_eq!(status_from_header("src/a.rs REMOVED"), FileStatus::Deleted);
        assert_eq!(status_from_header("src/a.rs +3 -1"), FileStatus::Modified);
        assert_eq!(status_from_header("new file mode 100644"), FileStatus::Added);
    }

    #[test]
    fn test_data_path_attribute_preferred() {
        let page = Page::parse(
            r#"<div data-tagsearch-path="src/lib.rs"><div class="file-header"><a>ignored.txt</a></div>
               <table><tr><td data-line-type="addition" class="diff-text-cell">pub fn run() {}</td></tr></table></div>"#,
        );
        let files = extract_files(&page);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "src/lib.rs");
        assert_eq!(files[0].additions, 1);
        assert_eq!(files[0].changes[0].added[0].info.as_deref(), Some("run"));
    }

    #[test]
    fn test_split_view_pair_is_one_hunk() {
        let page = Page::parse(
            r#"<div class="file" data-tagsearch-path="src/app.js"><table>
                 <tr><td class="blob-num" data-line-number="4"></td><td class="blob-code blob-code-deletion">-function oldName() {</td>
                     <td class="blob-num empty-cell"></td><td class="blob-code blob-code-empty empty-cell"></td></tr>
                 <tr><td class="blob-num empty-cell"></td><td class="blob-code blob-code-empty empty-cell"></td>
                     <td class="blob-num" data-line-number="4"></td><td class="blob-code blob-code-addition">+function newName() {</td></tr>
               </table></div>"#,
        );
        let files = extract_files(&page);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].changes.len(), 1);
        assert_eq!(files[0].changes[0].removed.len(), 1);
        assert_eq!(files[0].changes[0].added.len(), 1);
    }

    #[test]
    fn test_no_containers_no_files() {
        assert!(extract_files(&Page::parse("<p>empty</p>")).is_empty());
    }
}
