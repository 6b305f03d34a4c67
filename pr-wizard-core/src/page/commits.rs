// commit message extraction cascade

use super::cascade::{non_empty, Attempt, Cascade};
use super::selectors::{COMMIT_HREF_NEEDLE, COMMIT_SELECTORS};
use super::{element_text, Page};
use crate::text::{is_commit_candidate, is_page_text_candidate};

/// returned when every strategy comes back empty; never an empty list
pub const PLACEHOLDER_COMMITS: [&str; 2] = [
    "Code changes and improvements",
    "Updated project files and functionality",
];

/// strategy label reported when the placeholder list was used
pub const PLACEHOLDER_STRATEGY: &str = "placeholder";

/// commit titles on the page, at most `limit`, boilerplate removed,
/// tagged with the strategy that produced them
pub fn extract_commits(page: &Page, limit: usize) -> Attempt<Vec<String>> {
    let mut attempt = commit_cascade().run(page).unwrap_or_else(|| Attempt {
        strategy: PLACEHOLDER_STRATEGY,
        value: PLACEHOLDER_COMMITS.iter().map(|s| s.to_string()).collect(),
    });
    attempt.value.truncate(limit.max(1));
    attempt
}

fn commit_cascade() -> Cascade<Vec<String>> {
    let mut cascade = Cascade::new("commits");
    for &selector in COMMIT_SELECTORS {
        cascade = cascade.then(selector, move |page| {
            non_empty(dedup(
                page.select(selector)
                    .into_iter()
                    .map(element_text)
                    .filter(|t| is_commit_candidate(t)),
            ))
        });
    }
    cascade
        .then("commit links", commits_from_links)
        .then("page text", commits_from_page_text)
}

fn commits_from_links(page: &Page) -> Option<Vec<String>> {
    non_empty(dedup(
        page.select("a[href]")
            .into_iter()
            .filter(|a| {
                a.value()
                    .attr("href")
                    .map(|href| href.contains(COMMIT_HREF_NEEDLE))
                    .unwrap_or(false)
            })
            .map(element_text)
            .filter(|t| is_commit_candidate(t)),
    ))
}

fn commits_from_page_text(page: &Page) -> Option<Vec<String>> {
    non_empty(dedup(
        page.text_lines().into_iter().filter(|t| is_page_text_candidate(t)),
    ))
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
