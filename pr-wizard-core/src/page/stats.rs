// diff statistics extraction cascade

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Node};

use super::cascade::Cascade;
use super::selectors::{STAT_NUMBER_SELECTORS, STAT_SUMMARY_SELECTORS};
use super::{element_text, Page};
use crate::analysis::{ChangeStats, FileChange};
use crate::text::parse_count;

lazy_static! {
    static ref PLUS_COUNT: Regex = Regex::new(r"\+\s?([\d,]+)").unwrap();
    static ref MINUS_COUNT: Regex = Regex::new(r"[-−–]\s?([\d,]+)").unwrap();
    static ref SENTENCE_COUNTS: Regex =
        Regex::new(r"(?i)([\d,]+)\s+additions?\s+and\s+([\d,]+)\s+deletions?").unwrap();
    static ref FILES_CHANGED: Regex =
        Regex::new(r"(?i)([\d,]+)\s+changed\s+files?|([\d,]+)\s+files?\s+changed").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Addition,
    Deletion,
}

/// page-level stats; falls back to summing `files` when the page shows none
pub fn extract_stats(page: &Page, files: &[FileChange]) -> ChangeStats {
    let summed = files.iter().fold((0usize, 0usize), |(adds, dels), f| {
        (adds.saturating_add(f.additions), dels.saturating_add(f.deletions))
    });
    let (additions, deletions) = line_count_cascade(summed, !files.is_empty())
        .run(page)
        .map(|attempt| attempt.value)
        .unwrap_or((0, 0));

    let files_changed = page
        .text_lines()
        .iter()
        .find_map(|line| {
            FILES_CHANGED.captures(line).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(2))
                    .and_then(|m| parse_count(m.as_str()))
            })
        })
        .unwrap_or(files.len());

    ChangeStats {
        files_changed,
        additions,
        deletions,
    }
}

fn line_count_cascade(summed: (usize, usize), have_files: bool) -> Cascade<(usize, usize)> {
    let mut cascade = Cascade::new("diff stats");
    for &selector in STAT_NUMBER_SELECTORS {
        cascade = cascade.then(selector, move |page| counts_from_elements(page, selector));
    }
    cascade
        .then("summary block text", counts_from_summary_text)
        .then("summary sentence", counts_from_sentence)
        .then("per-file sum", move |_| have_files.then_some(summed))
}

fn counts_from_elements(page: &Page, selector: &str) -> Option<(usize, usize)> {
    let mut additions = None;
    let mut deletions = None;

    for el in page.select(selector) {
        let text = element_text(el);
        let Some(count) = parse_count(&text) else {
            continue;
        };
        match classify_stat_element(el, &text) {
            Some(Sign::Addition) if additions.is_none() => additions = Some(count),
            Some(Sign::Deletion) if deletions.is_none() => deletions = Some(count),
            _ => {}
        }
    }

    if additions.is_none() && deletions.is_none() {
        None
    } else {
        Some((additions.unwrap_or(0), deletions.unwrap_or(0)))
    }
}

/// companion class names first, then sign characters, then sibling text
fn classify_stat_element(el: ElementRef<'_>, text: &str) -> Option<Sign> {
    for class in el.value().classes() {
        let class = class.to_lowercase();
        if ["success", "green", "added", "addition"].iter().any(|n| class.contains(n)) {
            return Some(Sign::Addition);
        }
        if ["danger", "red", "removed", "deletion", "deleted"].iter().any(|n| class.contains(n)) {
            return Some(Sign::Deletion);
        }
    }

    match text.trim_start().chars().next() {
        Some('+') => return Some(Sign::Addition),
        Some('-') | Some('−') | Some('–') => return Some(Sign::Deletion),
        _ => {}
    }

    let sibling_text: String = el
        .next_siblings()
        .take(2)
        .filter_map(|node| match node.value() {
            Node::Text(t) => Some(t.to_string()),
            Node::Element(_) => ElementRef::wrap(node).map(element_text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if sibling_text.contains("addition") {
        Some(Sign::Addition)
    } else if sibling_text.contains("deletion") {
        Some(Sign::Deletion)
    } else {
        None
    }
}

fn counts_from_summary_text(page: &Page) -> Option<(usize, usize)> {
    STAT_SUMMARY_SELECTORS.iter().find_map(|selector| {
        page.select(selector).into_iter().find_map(|block| {
            let text = element_text(block);
            let additions = first_count(&PLUS_COUNT, &text);
            let deletions = first_count(&MINUS_COUNT, &text);
            if additions.is_none() && deletions.is_none() {
                None
            } else {
                Some((additions.unwrap_or(0), deletions.unwrap_or(0)))
            }
        })
    })
}

fn counts_from_sentence(page: &Page) -> Option<(usize, usize)> {
    page.text_lines().iter().find_map(|line| {
        SENTENCE_COUNTS.captures(line).map(|caps| {
            (
                parse_count(&caps[1]).unwrap_or(0),
                parse_count(&caps[2]).unwrap_or(0),
            )
        })
    })
}

fn first_count(pattern: &Regex, text: &str) -> Option<usize> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_count(m.as_str()))
}
