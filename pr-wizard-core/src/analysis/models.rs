// data model for one extraction/generation cycle; nothing here outlives it

use serde::{Deserialize, Serialize};

use super::classifier::ChangeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

/// role of a single diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineRole {
    Added,
    Removed,
    Context,
}

/// one classified line of a diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChange {
    pub kind: ChangeKind,
    pub content: String,
    /// captured name (function, module, endpoint...) when the pattern has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// human readable functionality label, e.g. "Authentication system"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub line_number: usize,
}

/// a contiguous run of added/removed lines plus the context that preceded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeGroup {
    pub context: Vec<CodeChange>,
    pub added: Vec<CodeChange>,
    pub removed: Vec<CodeChange>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub status: FileStatus,
    pub additions: usize,
    pub deletions: usize,
    pub changes: Vec<ChangeGroup>,
    pub summary: String,
}

impl FileChange {
    pub fn added_lines(&self) -> impl Iterator<Item = &CodeChange> {
        self.changes.iter().flat_map(|g| g.added.iter())
    }

    pub fn removed_lines(&self) -> impl Iterator<Item = &CodeChange> {
        self.changes.iter().flat_map(|g| g.removed.iter())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStats {
    pub files_changed: usize,
    pub additions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChangeSet {
    pub files: Vec<FileChange>,
    pub stats: ChangeStats,
    pub summary: Vec<String>,
}

impl FileChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.stats == ChangeStats::default()
    }

    pub fn count_status(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}
