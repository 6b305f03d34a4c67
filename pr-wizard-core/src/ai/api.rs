// api interaction module - chat-completions style http provider and the dispatcher

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::local::LocalSynthesizer;
use super::prompts::build_prompt;
use super::provider::{GenerationProvider, GenerationRequest};
use crate::config::{Config, ProviderConfig};
use crate::error::{WizardError, WizardResult};
use crate::utils::truncate_with_ellipsis;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// rejected bodies are kept for the error message, not in full
const MAX_ERROR_BODY: usize = 300;
const PROBE_PROMPT: &str = "reply with the single word OK";
const PROBE_MAX_TOKENS: u32 = 5;

// chat-completions api structures
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// http provider speaking the openrouter/openai chat-completions dialect
pub struct RemoteProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl RemoteProvider {
    pub fn new(config: &ProviderConfig, endpoint: String, credential: &str) -> WizardResult<Self> {
        let headers = config.kind.headers(credential)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| WizardError::Config(format!("could not build http client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// one request, no retries
    pub async fn complete(&self, prompt: String, max_tokens: u32) -> WizardResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| WizardError::ProviderUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(WizardError::ProviderRejected {
                status: status.as_u16(),
                body: truncate_with_ellipsis(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| WizardError::MalformedResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| WizardError::MalformedResponse("no message content in response".into()))
    }

    /// cheap round trip used to check a credential
    pub async fn probe(&self) -> WizardResult<()> {
        self.complete(PROBE_PROMPT.to_string(), PROBE_MAX_TOKENS)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl GenerationProvider for RemoteProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> WizardResult<String> {
        self.complete(build_prompt(request), self.max_tokens).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    Remote,
    Local,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    pub source: GenerationSource,
    /// why the remote provider was not used, when it was configured
    pub fallback_reason: Option<String>,
}

/// routes a request to the configured provider, falling back to local synthesis
pub struct Dispatcher {
    remote: Option<Box<dyn GenerationProvider>>,
    local: LocalSynthesizer,
}

impl Dispatcher {
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: LocalSynthesizer,
        }
    }

    pub fn with_provider(provider: Box<dyn GenerationProvider>) -> Self {
        Self {
            remote: Some(provider),
            local: LocalSynthesizer,
        }
    }

    /// no endpoint or no credential means local-only; a missing credential is an
    /// error only when `require_provider` is set
    pub fn from_config(config: &Config) -> WizardResult<Self> {
        let Some(endpoint) = config.provider.resolved_endpoint() else {
            tracing::debug!("no provider endpoint configured, using local synthesis");
            return Ok(Self::local_only());
        };

        match config.api_key() {
            Some(key) => {
                let provider = RemoteProvider::new(&config.provider, endpoint, key)?;
                Ok(Self::with_provider(Box::new(provider)))
            }
            None if config.provider.require_provider => Err(WizardError::MissingCredential),
            None => {
                tracing::info!("no api key configured, using local synthesis");
                Ok(Self::local_only())
            }
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// never fails: any provider error lands on the local synthesiser
    pub async fn dispatch(&self, request: &GenerationRequest<'_>) -> Generated {
        let Some(remote) = &self.remote else {
            return Generated {
                text: self.local.synthesize(request),
                source: GenerationSource::Local,
                fallback_reason: None,
            };
        };

        match remote.generate(request).await {
            Ok(text) => {
                tracing::debug!("generated description with {}", remote.name());
                Generated {
                    text,
                    source: GenerationSource::Remote,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                tracing::warn!("{} failed, falling back to local synthesis: {e}", remote.name());
                Generated {
                    text: self.local.synthesize(request),
                    source: GenerationSource::Local,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }
}

/// check a credential against the configured provider without saving it
pub async fn test_api_key(config: &Config, key: &str) -> WizardResult<()> {
    let key = key.trim();
    if key.is_empty() {
        return Err(WizardError::MissingCredential);
    }
    let endpoint = config.provider.resolved_endpoint().ok_or_else(|| {
        WizardError::Config("no provider endpoint configured to test against".into())
    })?;
    RemoteProvider::new(&config.provider, endpoint, key)?
        .probe()
        .await
}
