// configuration module - provider selection, extraction limits and the stored credential
//
// sources, highest priority first: cli flags > environment > config file > defaults

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{WizardError, WizardResult};

pub const DEFAULT_MAX_COMMITS: usize = 10;
/// older page layouts listed up to twenty commits before collapsing
pub const LEGACY_MAX_COMMITS: usize = 20;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub credentials: Credentials,
}

/// which generation backend is active; exactly one per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    #[default]
    OpenRouter,
    OpenAi,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// overrides the kind's default endpoint; required for `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// surface a missing credential as an error instead of synthesising locally
    #[serde(default)]
    pub require_provider: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_commits() -> usize {
    DEFAULT_MAX_COMMITS
}

fn default_wait_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            require_provider: false,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_commits: DEFAULT_MAX_COMMITS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
        }
    }
}

impl ProviderKind {
    pub fn parse(value: &str) -> WizardResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" | "none" => Ok(ProviderKind::Local),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "openai" => Ok(ProviderKind::OpenAi),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(WizardError::Config(format!("unknown provider kind '{other}'"))),
        }
    }

    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenRouter => Some(OPENROUTER_ENDPOINT),
            ProviderKind::OpenAi => Some(OPENAI_ENDPOINT),
            ProviderKind::Local | ProviderKind::Custom => None,
        }
    }

    /// header builder for the active provider
    pub fn headers(self, credential: &str) -> WizardResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {credential}"))
            .map_err(|_| WizardError::Config("api key contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if self == ProviderKind::OpenRouter {
            headers.insert(
                "HTTP-Referer",
                HeaderValue::from_static("https://github.com/jamiehdev/pr-wizard"),
            );
            headers.insert("X-Title", HeaderValue::from_static("pr-wizard"));
        }

        Ok(headers)
    }
}

impl ProviderConfig {
    /// `None` means local-only mode
    pub fn resolved_endpoint(&self) -> Option<String> {
        if self.kind == ProviderKind::Local {
            return None;
        }
        self.endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.kind.default_endpoint().map(str::to_string))
    }
}

impl Config {
    /// `$CONFIG_DIR/pr-wizard/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pr-wizard").join("config.toml"))
    }

    /// load the file (if any), then apply environment overrides
    pub fn load(path: Option<&Path>) -> WizardResult<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        let mut config = match path {
            Some(ref p) if p.exists() => Self::load_file(p)?,
            _ => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> WizardResult<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| WizardError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> WizardResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| WizardError::Config(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// environment overrides; `lookup` is `std::env::var` outside of tests
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("PR_WIZARD_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.credentials.api_key = Some(key.trim().to_string());
        }
        if let Some(kind) = lookup("PR_WIZARD_PROVIDER") {
            match ProviderKind::parse(&kind) {
                Ok(kind) => self.provider.kind = kind,
                Err(e) => tracing::warn!("ignoring PR_WIZARD_PROVIDER: {e}"),
            }
        }
        if let Some(model) = lookup("PR_WIZARD_MODEL").filter(|m| !m.trim().is_empty()) {
            self.provider.model = model;
        }
        if let Some(endpoint) = lookup("PR_WIZARD_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            self.provider.endpoint = Some(endpoint);
        }
    }

    pub fn validate(&self) -> WizardResult<()> {
        if !(1..=LEGACY_MAX_COMMITS).contains(&self.extraction.max_commits) {
            return Err(WizardError::Config(format!(
                "extraction.max_commits must be between 1 and {LEGACY_MAX_COMMITS}, got {}",
                self.extraction.max_commits
            )));
        }
        if self.provider.kind == ProviderKind::Custom && self.provider.resolved_endpoint().is_none() {
            return Err(WizardError::Config(
                "provider.kind = \"custom\" needs provider.endpoint".to_string(),
            ));
        }
        Ok(())
    }

    /// the configured credential, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.credentials
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_openrouter_without_credential() {
        let config = Config::default();
        assert_eq!(config.provider.kind, ProviderKind::OpenRouter);
        assert_eq!(config.provider.resolved_endpoint().as_deref(), Some(OPENROUTER_ENDPOINT));
        assert!(config.api_key().is_none());
        assert_eq!(config.extraction.max_commits, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_kind_has_no_endpoint_even_if_set() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Local;
        config.provider.endpoint = Some("http://localhost:1234".into());
        assert!(config.provider.resolved_endpoint().is_none());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "PR_WIZARD_API_KEY" => Some("  sk-test  ".into()),
            "PR_WIZARD_PROVIDER" => Some("openai".into()),
            "PR_WIZARD_MODEL" => Some("gpt-4o".into()),
            _ => None,
        });
        assert_eq!(config.api_key(), Some("sk-test"));
        assert_eq!(config.provider.kind, ProviderKind::OpenAi);
        assert_eq!(config.provider.model, "gpt-4o");
    }

    #[test]
    fn test_blank_key_is_no_key() {
        let mut config = Config::default();
        config.credentials.api_key = Some("   ".into());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_commit_limit() {
        let mut config = Config::default();
        config.extraction.max_commits = LEGACY_MAX_COMMITS;
        assert!(config.validate().is_ok());
        config.extraction.max_commits = 21;
        assert!(matches!(config.validate(), Err(WizardError::Config(_))));
    }

    #[test]
    fn test_custom_kind_requires_endpoint() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Custom;
        assert!(config.validate().is_err());
        config.provider.endpoint = Some("http://127.0.0.1:8080/v1/chat/completions".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openrouter_headers_carry_metadata() {
        let headers = ProviderKind::OpenRouter.headers("abc").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.contains_key("X-Title"));
        assert!(headers.contains_key("HTTP-Referer"));

        let headers = ProviderKind::OpenAi.headers("abc").unwrap();
        assert!(!headers.contains_key("X-Title"));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.credentials.api_key = Some("sk-saved".into());
        config.provider.kind = ProviderKind::Local;
        config.save(&path).unwrap();

        let loaded = Config::load_file(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("sk-saved"));
        assert_eq!(loaded.provider.kind, ProviderKind::Local);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[provider]\nkind = \"local\"\n").unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Local);
        assert_eq!(config.provider.max_tokens, 1000);
        assert_eq!(config.extraction.wait_timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
    }
}
