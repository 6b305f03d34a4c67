// diff line roles and hunk grouping

use super::classifier::classify;
use super::models::{ChangeGroup, CodeChange, LineRole};
use super::summary::summarize_changes;

/// how many context lines before a hunk are kept with it
const HUNK_CONTEXT_LINES: usize = 2;

/// a raw diff line as scraped, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub role: LineRole,
    pub text: String,
    pub line_number: usize,
}

/// decide a line's role from any of the structural signals the page offers:
/// css classes, an explicit line-type attribute, or a leading sign character
pub fn line_role(classes: &[&str], line_type: Option<&str>, raw_text: &str) -> LineRole {
    let class_says = |needles: &[&str]| {
        classes
            .iter()
            .any(|c| needles.iter().any(|n| c.to_lowercase().contains(n)))
    };
    let attr = line_type.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    let raw = raw_text.trim_start_matches(['\n', '\r']);

    let is_added = class_says(&["addition", "blob-code-inner-addition", "diff-add"])
        || matches!(attr.as_str(), "addition" | "add" | "added" | "+")
        || (raw.starts_with('+') && !raw.starts_with("+++"));
    if is_added {
        return LineRole::Added;
    }

    let is_removed = class_says(&["deletion", "diff-del"])
        || matches!(attr.as_str(), "deletion" | "delete" | "deleted" | "removed" | "-")
        || (raw.starts_with('-') && !raw.starts_with("---"));
    if is_removed {
        return LineRole::Removed;
    }

    LineRole::Context
}

/// strip the diff marker and surrounding whitespace
pub fn clean_line(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(['\n', '\r']);
    let without_marker = match trimmed.chars().next() {
        Some('+') | Some('-') if !trimmed.starts_with("+++") && !trimmed.starts_with("---") => {
            &trimmed[1..]
        }
        _ => trimmed,
    };
    crate::text::normalize(without_marker)
}

/// group a file's diff lines into hunks; a hunk closes on the next context
/// line or at the end of input while added/removed lines are pending
pub fn group_hunks(lines: &[DiffLine]) -> Vec<ChangeGroup> {
    let mut groups = Vec::new();
    let mut recent_context: Vec<CodeChange> = Vec::new();
    let mut hunk_context: Vec<CodeChange> = Vec::new();
    let mut added: Vec<CodeChange> = Vec::new();
    let mut removed: Vec<CodeChange> = Vec::new();

    for line in lines {
        match line.role {
            LineRole::Context => {
                // split-view filler cells carry no text and must not close a hunk
                if line.text.is_empty() {
                    continue;
                }
                if !added.is_empty() || !removed.is_empty() {
                    groups.push(flush(&mut hunk_context, &mut added, &mut removed));
                }
                recent_context.push(classify(&line.text, line.line_number));
                if recent_context.len() > HUNK_CONTEXT_LINES {
                    recent_context.remove(0);
                }
            }
            LineRole::Added | LineRole::Removed => {
                if line.text.is_empty() {
                    continue;
                }
                if added.is_empty() && removed.is_empty() {
                    hunk_context = recent_context.clone();
                }
                let change = classify(&line.text, line.line_number);
                if line.role == LineRole::Added {
                    added.push(change);
                } else {
                    removed.push(change);
                }
            }
        }
    }

    if !added.is_empty() || !removed.is_empty() {
        groups.push(flush(&mut hunk_context, &mut added, &mut removed));
    }

    groups
}

fn flush(
    context: &mut Vec<CodeChange>,
    added: &mut Vec<CodeChange>,
    removed: &mut Vec<CodeChange>,
) -> ChangeGroup {
    let summary = summarize_changes(added, removed);
    ChangeGroup {
        context: std::mem::take(context),
        added: std::mem::take(added),
        removed: std::mem::take(removed),
        summary,
    }
}
