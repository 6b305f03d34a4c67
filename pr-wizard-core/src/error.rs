// error taxonomy for the extraction -> generation -> injection pipeline

use thiserror::Error;

use crate::form::FieldRole;

#[derive(Debug, Error)]
pub enum WizardError {
    /// every cascade level came back empty, nothing worth describing
    #[error("no commits or file changes could be extracted from the page")]
    ExtractionEmpty,

    #[error("provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("provider rejected the request ({status}): {body}")]
    ProviderRejected { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("no api key configured; run `pr-wizard config set-key <key>` or set PR_WIZARD_API_KEY")]
    MissingCredential,

    #[error("could not find the {0} field on the page")]
    FormFieldNotFound(FieldRole),

    #[error("{0} is not a pull request creation page")]
    NotComparePage(String),

    #[error("failed to parse generated text: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WizardError {
    /// provider failures are recovered locally by the dispatcher
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            WizardError::ProviderUnreachable(_)
                | WizardError::ProviderRejected { .. }
                | WizardError::MalformedResponse(_)
        )
    }
}

pub type WizardResult<T> = Result<T, WizardError>;
