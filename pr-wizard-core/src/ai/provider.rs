// generation provider capability - remote http backends and the local synthesiser

use async_trait::async_trait;

use crate::analysis::FileChangeSet;
use crate::error::WizardResult;

/// inputs for one generation attempt
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub commits: &'a [String],
    pub changes: Option<&'a FileChangeSet>,
    /// include per-file classifications and summaries
    pub detailed: bool,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(commits: &'a [String]) -> Self {
        Self {
            commits,
            changes: None,
            detailed: false,
        }
    }

    pub fn with_changes(mut self, changes: &'a FileChangeSet, detailed: bool) -> Self {
        self.changes = Some(changes);
        self.detailed = detailed;
        self
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// raw generated text, not yet split into title/body
    async fn generate(&self, request: &GenerationRequest<'_>) -> WizardResult<String>;
}
