// analysis module - classification, hunk grouping and summaries

pub mod classifier;
pub mod hunks;
pub mod models;
pub mod summary;

pub use classifier::{classify, classify_line, ChangeKind, Classification};
pub use hunks::{clean_line, group_hunks, line_role, DiffLine};
pub use models::{
    ChangeGroup, ChangeStats, CodeChange, FileChange, FileChangeSet, FileStatus, LineRole,
};
pub use summary::summarize_changes;

/// build a [`FileChange`] from scraped lines; header counts win when the page shows them
pub fn analyse_file(
    filename: String,
    status: FileStatus,
    header_counts: Option<(usize, usize)>,
    lines: &[DiffLine],
) -> FileChange {
    let changes = group_hunks(lines);
    let counted_added: usize = changes.iter().map(|g| g.added.len()).sum();
    let counted_removed: usize = changes.iter().map(|g| g.removed.len()).sum();
    let (additions, deletions) = header_counts.unwrap_or((counted_added, counted_removed));

    let added: Vec<CodeChange> = changes.iter().flat_map(|g| g.added.clone()).collect();
    let removed: Vec<CodeChange> = changes.iter().flat_map(|g| g.removed.clone()).collect();
    let summary = if changes.is_empty() {
        describe_status_only(status, additions, deletions)
    } else {
        summarize_changes(&added, &removed)
    };

    FileChange {
        filename,
        status,
        additions,
        deletions,
        changes,
        summary,
    }
}

/// files with no rendered diff (collapsed, binary, too large)
fn describe_status_only(status: FileStatus, additions: usize, deletions: usize) -> String {
    match status {
        FileStatus::Added => format!("New file with {additions} lines"),
        FileStatus::Deleted => format!("Removed file ({deletions} lines)"),
        FileStatus::Renamed => "Renamed file".to_string(),
        FileStatus::Modified => format!("Modified (+{additions} -{deletions})"),
    }
}

/// aggregate per-file results with the page-level stats
pub fn build_change_set(files: Vec<FileChange>, stats: ChangeStats) -> FileChangeSet {
    let mut summary = Vec::new();
    if stats.files_changed > 0 || stats.additions > 0 || stats.deletions > 0 {
        summary.push(format!(
            "{} {} changed, +{} -{}",
            stats.files_changed,
            if stats.files_changed == 1 { "file" } else { "files" },
            stats.additions,
            stats.deletions
        ));
    }

    if !files.is_empty() {
        let added: Vec<CodeChange> = files.iter().flat_map(|f| f.added_lines().cloned()).collect();
        let removed: Vec<CodeChange> =
            files.iter().flat_map(|f| f.removed_lines().cloned()).collect();
        if !added.is_empty() || !removed.is_empty() {
            summary.push(summarize_changes(&added, &removed));
        }
    }

    for file in &files {
        summary.push(format!("{}: {}", file.filename, file.summary));
    }

    FileChangeSet {
        files,
        stats,
        summary,
    }
}
