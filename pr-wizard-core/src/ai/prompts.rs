// prompt construction - pure templating over commits and analysed changes

use crate::analysis::{ChangeGroup, FileChangeSet};
use crate::utils::truncate_with_ellipsis;

use super::provider::GenerationRequest;

/// longest diff line quoted in a detailed prompt
const MAX_QUOTED_LINE: usize = 120;
/// lines quoted per hunk before eliding the rest
const MAX_LINES_PER_GROUP: usize = 6;

/// build the user prompt sent to the remote provider
pub fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "write a pull request title and description for the following changes.\n\n",
    );

    prompt.push_str("📝 COMMITS:\n");
    if request.commits.is_empty() {
        prompt.push_str("- (no commit messages were found)\n");
    }
    for commit in request.commits {
        prompt.push_str(&format!("- {commit}\n"));
    }
    prompt.push('\n');

    if let Some(changes) = request.changes {
        if !changes.summary.is_empty() {
            prompt.push_str("📊 CHANGE SUMMARY:\n");
            for line in &changes.summary {
                prompt.push_str(&format!("- {line}\n"));
            }
            prompt.push('\n');
        }

        if request.detailed && !changes.files.is_empty() {
            push_file_details(&mut prompt, changes);
        }
    }

    prompt.push_str("📋 RESPONSE FORMAT:\n");
    prompt.push_str("Title: <one line, under 72 characters>\n\n");
    prompt.push_str("Description:\n");
    prompt.push_str("<markdown body: a short summary paragraph, then bullet points for the notable changes>\n\n");
    prompt.push_str("respond with the title and description only, no preamble.\n");

    prompt
}

fn push_file_details(prompt: &mut String, changes: &FileChangeSet) {
    prompt.push_str("🔍 FILE DETAILS:\n");
    for file in &changes.files {
        prompt.push_str(&format!(
            "\n{} ({}, +{} -{})\n",
            file.filename,
            file.status.as_str(),
            file.additions,
            file.deletions
        ));
        prompt.push_str(&format!("  summary: {}\n", file.summary));
        for group in &file.changes {
            push_group(prompt, group);
        }
    }
    prompt.push('\n');
}

fn push_group(prompt: &mut String, group: &ChangeGroup) {
    prompt.push_str(&format!("  hunk: {}\n", group.summary));
    let lines = group
        .added
        .iter()
        .map(|c| ('+', c))
        .chain(group.removed.iter().map(|c| ('-', c)));

    let total = group.added.len() + group.removed.len();
    for (sign, change) in lines.take(MAX_LINES_PER_GROUP) {
        let label = match &change.info {
            Some(info) => format!("{} {}", change.kind, info),
            None => change.kind.to_string(),
        };
        prompt.push_str(&format!(
            "    {sign} [{label}] {}\n",
            truncate_with_ellipsis(&change.content, MAX_QUOTED_LINE)
        ));
    }
    if total > MAX_LINES_PER_GROUP {
        prompt.push_str(&format!(
            "    ... {} more changed lines\n",
            total - MAX_LINES_PER_GROUP
        ));
    }
}
