// local description synthesiser - deterministic, no network

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::provider::{GenerationProvider, GenerationRequest};
use crate::analysis::{summarize_changes, CodeChange, FileChangeSet, FileStatus};
use crate::error::WizardResult;
use crate::text::is_commit_candidate;

pub const FALLBACK_TITLE: &str = "Code changes and improvements";
pub const MULTIPLE_CHANGES_TITLE: &str = "Multiple improvements and changes";
pub const ADD_TITLE: &str = "Add new features and functionality";
pub const FIX_TITLE: &str = "Fix bugs and issues";
pub const UPDATE_TITLE: &str = "Update and improve existing functionality";

lazy_static! {
    static ref ADD_FAMILY: Regex =
        Regex::new(r"(?i)\b(add|adds|added|adding|feature|features|feat)\b").unwrap();
    static ref FIX_FAMILY: Regex =
        Regex::new(r"(?i)\b(fix|fixes|fixed|fixing|bug|bugs|bugfix|hotfix)\b").unwrap();
    static ref UPDATE_FAMILY: Regex = Regex::new(
        r"(?i)\b(update|updates|updated|updating|improve|improves|improved|improving|improvement|improvements)\b"
    ).unwrap();
    static ref REMOVE_FAMILY: Regex =
        Regex::new(r"(?i)\b(remove|removes|removed|delete|deletes|deleted|drop|drops)\b").unwrap();
    static ref REFACTOR_FAMILY: Regex = Regex::new(r"(?i)\brefactor\w*").unwrap();
    static ref TEST_FAMILY: Regex = Regex::new(r"(?i)\b(test|tests|testing|spec)\b").unwrap();
    static ref DOCS_FAMILY: Regex = Regex::new(r"(?i)\b(doc|docs|documentation|readme)\b").unwrap();
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSynthesizer;

impl LocalSynthesizer {
    /// "Title: ...\n\nDescription:\n..." built purely from the inputs
    pub fn synthesize(&self, request: &GenerationRequest<'_>) -> String {
        let commits = usable_commits(request.commits);
        let detailed_changes = request.changes.filter(|_| request.detailed);

        let title = detailed_changes
            .and_then(title_from_statuses)
            .unwrap_or_else(|| title_from_commits(&commits));

        let mut body = String::new();
        body.push_str("## Summary\n");
        body.push_str(&summary_paragraph(&commits, request.changes));
        body.push_str("\n\n");

        if !commits.is_empty() {
            body.push_str("## Commits\n");
            for (i, commit) in commits.iter().enumerate() {
                body.push_str(&format!("{}. {}\n", i + 1, commit));
            }
            body.push('\n');
        }

        match detailed_changes {
            Some(changes) if !changes.files.is_empty() => {
                body.push_str(&file_breakdown(changes));
            }
            _ if !commits.is_empty() => {
                body.push_str("## Changes\n");
                for commit in &commits {
                    body.push_str(&format!("- {}: {}\n", commit_phrase(commit), commit));
                }
            }
            _ => {}
        }

        format!("Title: {}\n\nDescription:\n{}", title, body.trim_end())
    }
}

#[async_trait]
impl GenerationProvider for LocalSynthesizer {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> WizardResult<String> {
        Ok(self.synthesize(request))
    }
}

fn usable_commits(commits: &[String]) -> Vec<&str> {
    commits
        .iter()
        .map(|c| c.trim())
        .filter(|c| is_commit_candidate(c))
        .collect()
}

/// added > modified > deleted; renames alone say nothing
fn title_from_statuses(changes: &FileChangeSet) -> Option<String> {
    let added = changes.count_status(FileStatus::Added);
    let modified = changes.count_status(FileStatus::Modified);
    let deleted = changes.count_status(FileStatus::Deleted);

    if added > 0 {
        Some(format!("Add new functionality ({} new {})", added, files_word(added)))
    } else if modified > 0 {
        Some(format!(
            "Update existing functionality ({} modified {})",
            modified,
            files_word(modified)
        ))
    } else if deleted > 0 {
        Some(format!(
            "Remove unused code ({} deleted {})",
            deleted,
            files_word(deleted)
        ))
    } else {
        None
    }
}

fn title_from_commits(commits: &[&str]) -> String {
    match commits {
        [] => FALLBACK_TITLE.to_string(),
        [only] => only.to_string(),
        _ => {
            let joined = commits.join("\n");
            if ADD_FAMILY.is_match(&joined) {
                ADD_TITLE.to_string()
            } else if FIX_FAMILY.is_match(&joined) {
                FIX_TITLE.to_string()
            } else if UPDATE_FAMILY.is_match(&joined) {
                UPDATE_TITLE.to_string()
            } else {
                MULTIPLE_CHANGES_TITLE.to_string()
            }
        }
    }
}

fn commit_phrase(commit: &str) -> &'static str {
    if ADD_FAMILY.is_match(commit) {
        "New feature"
    } else if FIX_FAMILY.is_match(commit) {
        "Bug fix"
    } else if UPDATE_FAMILY.is_match(commit) {
        "Improvement"
    } else if REMOVE_FAMILY.is_match(commit) {
        "Cleanup"
    } else if REFACTOR_FAMILY.is_match(commit) {
        "Refactor"
    } else if TEST_FAMILY.is_match(commit) {
        "Tests"
    } else if DOCS_FAMILY.is_match(commit) {
        "Documentation"
    } else {
        "Change"
    }
}

fn summary_paragraph(commits: &[&str], changes: Option<&FileChangeSet>) -> String {
    let mut text = format!(
        "This pull request contains {} {}.",
        commits.len(),
        if commits.len() == 1 { "commit" } else { "commits" }
    );
    if let Some(changes) = changes {
        let stats = changes.stats;
        if stats.files_changed > 0 || stats.additions > 0 || stats.deletions > 0 {
            text.push_str(&format!(
                " {} {} changed with {} additions and {} deletions.",
                stats.files_changed,
                files_word(stats.files_changed),
                stats.additions,
                stats.deletions
            ));
        }
    }
    text
}

fn file_breakdown(changes: &FileChangeSet) -> String {
    let mut out = String::from("## File changes\n");
    for file in &changes.files {
        out.push_str(&format!(
            "- `{}` ({}, +{} -{}): {}\n",
            file.filename,
            file.status.as_str(),
            file.additions,
            file.deletions,
            file.summary
        ));
        let mut seen: Vec<&str> = vec![file.summary.as_str()];
        for group in &file.changes {
            if !seen.contains(&group.summary.as_str()) {
                seen.push(group.summary.as_str());
                out.push_str(&format!("  - {}\n", group.summary));
            }
        }
    }

    let all_lines: Vec<&CodeChange> = changes
        .files
        .iter()
        .flat_map(|f| f.added_lines().chain(f.removed_lines()))
        .collect();
    let mut areas: Vec<&str> = Vec::new();
    for line in &all_lines {
        if let Some(label) = line.context.as_deref() {
            if !areas.contains(&label) {
                areas.push(label);
            }
        }
    }
    if !areas.is_empty() {
        out.push_str("\n## Affected areas\n");
        for area in areas {
            out.push_str(&format!("- {area}\n"));
        }
    }

    let added: Vec<CodeChange> = changes.files.iter().flat_map(|f| f.added_lines().cloned()).collect();
    let removed: Vec<CodeChange> =
        changes.files.iter().flat_map(|f| f.removed_lines().cloned()).collect();
    if !added.is_empty() || !removed.is_empty() {
        out.push_str(&format!("\nOverall: {}\n", summarize_changes(&added, &removed)));
    }

    out
}

fn files_word(count: usize) -> &'static str {
    if count == 1 {
        "file"
    } else {
        "files"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyse_file, build_change_set, ChangeStats, DiffLine, LineRole};

    fn commits(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn one_added_file() -> FileChangeSet {
        let lines = vec![DiffLine {
            role: LineRole::Added,
            text: "export async function listUsers(req, res) {".into(),
            line_number: 1,
        }];
        let file = analyse_file("api/users.js".into(), FileStatus::Added, None, &lines);
        build_change_set(
            vec![file],
            ChangeStats {
                files_changed: 1,
                additions: 1,
                deletions: 0,
            },
        )
    }

    #[test]
    fn test_fix_family_title_and_numbered_commits() {
        let list = commits(&["Fix login bug", "Update README"]);
        let text = LocalSynthesizer.synthesize(&GenerationRequest::new(&list));

        assert!(text.starts_with("Title: Fix bugs and issues\n"));
        assert!(text.contains("1. Fix login bug"));
        assert!(text.contains("2. Update README"));
        assert!(text.contains("- Bug fix: Fix login bug"));
        assert!(text.contains("- Improvement: Update README"));
    }

    #[test]
    fn test_single_commit_is_title_verbatim() {
        let list = commits(&["Refactor session storage", "3 files changed"]);
        let text = LocalSynthesizer.synthesize(&GenerationRequest::new(&list));
        assert!(text.starts_with("Title: Refactor session storage\n"));
    }

    #[test]
    fn test_title_families_and_fallbacks() {
        assert_eq!(title_from_commits(&["Add search box", "Fix typo in header"]), ADD_TITLE);
        assert_eq!(title_from_commits(&["Improve caching", "Tweak lint config"]), UPDATE_TITLE);
        assert_eq!(title_from_commits(&["Rework caching", "Tweak lint config"]), MULTIPLE_CHANGES_TITLE);
        assert_eq!(title_from_commits(&[]), FALLBACK_TITLE);
        // "address" is not an "add"
        assert_eq!(title_from_commits(&["Address review notes", "Tweak lint config"]), MULTIPLE_CHANGES_TITLE);
    }

    #[test]
    fn test_detailed_added_file_title() {
        let changes = one_added_file();
        let list = commits(&["Wire up user listing", "Tidy the router setup"]);
        let request = GenerationRequest::new(&list).with_changes(&changes, true);
        let text = LocalSynthesizer.synthesize(&request);

        assert!(text.starts_with("Title: Add new functionality (1 new file)\n"));
        assert!(!text.contains("Update existing functionality"));
        assert!(text.contains("- `api/users.js` (added, +1 -0): Added function listUsers"));
    }

    #[test]
    fn test_changes_ignored_without_detailed_flag() {
        let changes = one_added_file();
        let list = commits(&["Fix login bug", "Update README"]);
        let request = GenerationRequest::new(&list).with_changes(&changes, false);
        let text = LocalSynthesizer.synthesize(&request);
        assert!(text.starts_with("Title: Fix bugs and issues\n"));
        assert!(!text.contains("## File changes"));
        assert!(text.contains("1 file changed with 1 additions and 0 deletions."));
    }

    #[test]
    fn test_output_is_byte_identical_for_same_inputs() {
        let changes = one_added_file();
        let list = commits(&["Fix login bug", "Add user listing"]);
        let request = GenerationRequest::new(&list).with_changes(&changes, true);
        assert_eq!(
            LocalSynthesizer.synthesize(&request),
            LocalSynthesizer.synthesize(&request)
        );
    }

    #[tokio::test]
    async fn test_provider_impl_matches_synthesize() {
        let list = commits(&["Fix login bug", "Update README"]);
        let request = GenerationRequest::new(&list);
        let text = LocalSynthesizer.generate(&request).await.unwrap();
        assert_eq!(text, LocalSynthesizer.synthesize(&request));
        assert_eq!(LocalSynthesizer.name(), "local");
    }
}
