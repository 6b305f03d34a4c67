// native-messaging host - length-prefixed json frames on stdin/stdout

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ai::test_api_key;
use crate::config::Config;
use crate::error::{WizardError, WizardResult};
use crate::form::{inject, Notice};
use crate::page::{is_compare_page, Navigation, Page, PageSession};
use crate::utils::mask_secret;
use crate::{generate_for_page, run_pipeline};

/// browsers cap host-bound messages; anything larger is a framing error
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    pub html: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub detailed_analysis: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostRequest {
    GenerateDescription(GeneratePayload),
    InsertDescription {
        html: String,
        text: String,
    },
    TriggerGeneration(GeneratePayload),
    ShowError {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    SetApiKey {
        api_key: String,
    },
    GetApiKey,
    #[serde(rename_all = "camelCase")]
    TestApiKey {
        #[serde(default)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// what the page shows for a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl HostResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            notice: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            notice: Some(Notice::error(message.clone())),
            error: Some(message),
        }
    }
}

/// read one frame; `None` on a clean end of input
pub async fn read_message<R>(reader: &mut R) -> WizardResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(WizardError::Parse(format!(
                "input closed after {filled} of 4 length prefix bytes"
            )));
        }
        filled += n;
    }

    let len = u32::from_ne_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(WizardError::Parse(format!(
            "message of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> WizardResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| WizardError::Parse("response too large to frame".into()))?;
    writer.write_all(&len.to_ne_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// request handler; owns the config and the navigation session
pub struct Host {
    config: Config,
    config_path: Option<PathBuf>,
    session: PageSession,
}

impl Host {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            session: PageSession::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// handle a raw frame; malformed requests become error responses
    pub async fn handle_raw(&mut self, payload: &[u8]) -> HostResponse {
        match serde_json::from_slice::<HostRequest>(payload) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!("unreadable request: {e}");
                HostResponse::err(format!("invalid request: {e}"))
            }
        }
    }

    pub async fn handle(&mut self, request: HostRequest) -> HostResponse {
        match self.dispatch(request).await {
            Ok(data) => HostResponse::ok(data),
            Err(e) => {
                tracing::warn!("request failed: {e}");
                HostResponse::err(e.to_string())
            }
        }
    }

    async fn dispatch(&mut self, request: HostRequest) -> WizardResult<Value> {
        match request {
            HostRequest::GenerateDescription(payload) => {
                let page = self.open_page(&payload);
                let (_, generated) =
                    generate_for_page(&page, &self.config, payload.detailed_analysis).await?;
                Ok(json!({
                    "text": generated.text,
                    "source": source_label(generated.source),
                }))
            }
            HostRequest::InsertDescription { html, text } => {
                let page = Page::parse(&html);
                Ok(serde_json::to_value(inject(&page, &text))?)
            }
            HostRequest::TriggerGeneration(payload) => {
                if let Some(url) = payload.url.as_deref() {
                    if !is_compare_page(url) {
                        return Err(WizardError::NotComparePage(url.to_string()));
                    }
                }
                let page = self.open_page(&payload);
                let output = run_pipeline(&page, &self.config, payload.detailed_analysis).await?;
                Ok(json!({
                    "text": output.generated.text,
                    "source": source_label(output.generated.source),
                    "commits": output.extraction.commits,
                    "plan": output.injection.plan,
                    "notice": output.injection.notice,
                }))
            }
            HostRequest::ShowError { message } => Ok(serde_json::to_value(Notice::error(message))?),
            HostRequest::SetApiKey { api_key } => {
                let key = api_key.trim();
                if key.is_empty() {
                    return Err(WizardError::MissingCredential);
                }
                self.config.credentials.api_key = Some(key.to_string());
                if let Some(path) = &self.config_path {
                    // persist the file's own settings, not environment overrides
                    let mut stored = if path.exists() {
                        Config::load_file(path)?
                    } else {
                        Config::default()
                    };
                    stored.credentials.api_key = Some(key.to_string());
                    stored.save(path)?;
                }
                Ok(json!({ "saved": self.config_path.is_some() }))
            }
            HostRequest::GetApiKey => Ok(json!({ "apiKey": self.config.api_key() })),
            HostRequest::TestApiKey { api_key } => {
                let key = api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .or_else(|| self.config.api_key())
                    .map(str::to_string);
                let Some(key) = key else {
                    return Ok(json!({ "valid": false, "message": "no api key configured" }));
                };
                match test_api_key(&self.config, &key).await {
                    Ok(()) => Ok(json!({
                        "valid": true,
                        "message": format!("api key {} is valid", mask_secret(&key)),
                    })),
                    Err(e) => Ok(json!({ "valid": false, "message": e.to_string() })),
                }
            }
        }
    }

    fn open_page(&mut self, payload: &GeneratePayload) -> Page {
        let page = Page::parse(&payload.html);
        match payload.url.as_deref() {
            Some(url) => {
                if let Navigation::Changed { from, to } = self.session.observe(url) {
                    tracing::debug!("navigated from {from} to {to}");
                }
                page.with_url(url)
            }
            None => page,
        }
    }
}

fn source_label(source: crate::ai::GenerationSource) -> &'static str {
    match source {
        crate::ai::GenerationSource::Remote => "provider",
        crate::ai::GenerationSource::Local => "local",
    }
}

/// serve frames until the reader closes
pub async fn serve<R, W>(host: &mut Host, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let payload = match read_message(reader).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(e) => {
                // a broken frame leaves the stream unsynchronised, report and stop
                let _ = write_message(writer, &HostResponse::err(e.to_string())).await;
                return Err(e).context("failed to read native message");
            }
        };

        let response = host.handle_raw(&payload).await;
        write_message(writer, &response)
            .await
            .context("failed to write native message")?;
    }

    tracing::debug!("native-messaging input closed");
    Ok(())
}

pub async fn run_stdio(config: Config, config_path: Option<PathBuf>) -> Result<()> {
    let mut host = Host::new(config, config_path);
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    serve(&mut host, &mut stdin, &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::form::NoticeLevel;

    const COMPARE_PAGE: &str = r#"
        <html><body>
          <input id="pull_request_title">
          <textarea id="pull_request_body"></textarea>
          <div class="commit-message"><a href="/o/r/commit/abc">Fix login bug</a></div>
          <div class="commit-message"><a href="/o/r/commit/def">Update README</a></div>
        </body></html>
    "#;

    fn local_host() -> Host {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Local;
        Host::new(config, None)
    }

    fn frame(value: Value) -> Vec<u8> {
        let payload = serde_json::to_vec(&value).unwrap();
        let mut out = (payload.len() as u32).to_ne_bytes().to_vec();
        out.extend(payload);
        out
    }

    fn unframe(mut bytes: &[u8]) -> Vec<HostResponse> {
        let mut out = Vec::new();
        while bytes.len() >= 4 {
            let len = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
            out.push(serde_json::from_slice(&bytes[4..4 + len]).unwrap());
            bytes = &bytes[4 + len..];
        }
        out
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({"action": "getApiKey"})).await.unwrap();
        let mut reader = buf.as_slice();
        let payload = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(payload, br#"{"action":"getApiKey"}"#.to_vec());
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let bytes = (u32::MAX).to_ne_bytes();
        let mut reader = &bytes[..];
        assert!(matches!(read_message(&mut reader).await, Err(WizardError::Parse(_))));
    }

    #[tokio::test]
    async fn test_truncated_length_prefix_is_an_error() {
        for cut in 1..4 {
            let bytes = 7u32.to_ne_bytes();
            let mut reader = &bytes[..cut];
            assert!(
                matches!(read_message(&mut reader).await, Err(WizardError::Parse(_))),
                "{cut} prefix bytes"
            );
        }
        let mut empty: &[u8] = &[];
        assert!(read_message(&mut empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_serve_stops_on_truncated_prefix() {
        let mut input = frame(json!({"action": "getApiKey"}));
        input.extend_from_slice(&[3, 0]);

        let mut host = local_host();
        let mut reader = input.as_slice();
        let mut output = Vec::new();
        assert!(serve(&mut host, &mut reader, &mut output).await.is_err());

        let responses = unframe(&output);
        assert_eq!(responses.len(), 2);
        assert!(responses[0].success);
        assert!(!responses[1].success);
        assert_eq!(responses[1].notice.as_ref().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_serve_answers_each_frame() {
        let mut input = frame(json!({"action": "showError", "message": "boom"}));
        input.extend(frame(json!({"action": "noSuchAction"})));
        input.extend(frame(json!({"action": "getApiKey"})));

        let mut host = local_host();
        let mut reader = input.as_slice();
        let mut output = Vec::new();
        serve(&mut host, &mut reader, &mut output).await.unwrap();

        let responses = unframe(&output);
        assert_eq!(responses.len(), 3);
        assert!(responses[0].success);
        assert_eq!(responses[0].data.as_ref().unwrap()["level"], "error");
        assert_eq!(responses[0].data.as_ref().unwrap()["dismissAfterMs"], 5000);
        assert!(!responses[1].success);
        assert!(responses[2].success);
        assert_eq!(responses[2].data.as_ref().unwrap()["apiKey"], Value::Null);
    }

    #[tokio::test]
    async fn test_generate_description_locally() {
        let mut host = local_host();
        let response = host
            .handle(HostRequest::GenerateDescription(GeneratePayload {
                html: COMPARE_PAGE.to_string(),
                url: Some("https://github.com/o/r/compare/main...dev".into()),
                detailed_analysis: false,
            }))
            .await;
        assert!(response.success, "{:?}", response.error);
        let data = response.data.unwrap();
        assert_eq!(data["source"], "local");
        assert!(data["text"].as_str().unwrap().starts_with("Title: Fix bugs and issues"));
    }

    #[tokio::test]
    async fn test_trigger_generation_builds_plan() {
        let mut host = local_host();
        let response = host
            .handle(HostRequest::TriggerGeneration(GeneratePayload {
                html: COMPARE_PAGE.to_string(),
                url: Some("https://github.com/o/r/compare/main...dev".into()),
                detailed_analysis: true,
            }))
            .await;
        assert!(response.success, "{:?}", response.error);
        let data = response.data.unwrap();
        assert_eq!(data["plan"]["title"]["selector"], "#pull_request_title");
        assert_eq!(data["plan"]["title"]["value"], "Fix bugs and issues");
        assert_eq!(data["notice"]["level"], "success");
    }

    #[tokio::test]
    async fn test_trigger_generation_rejects_other_pages() {
        let mut host = local_host();
        let response = host
            .handle(HostRequest::TriggerGeneration(GeneratePayload {
                html: COMPARE_PAGE.to_string(),
                url: Some("https://github.com/o/r/pull/12".into()),
                detailed_analysis: false,
            }))
            .await;
        assert!(!response.success);
        let expected = WizardError::NotComparePage("https://github.com/o/r/pull/12".into()).to_string();
        assert_eq!(response.error.as_deref(), Some(expected.as_str()));

        let notice = response.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, expected);
        assert_eq!(notice.dismiss_after_ms, 5000);
    }

    #[tokio::test]
    async fn test_empty_page_reports_extraction_failure() {
        let mut host = local_host();
        let response = host
            .handle(HostRequest::GenerateDescription(GeneratePayload {
                html: "<html><body></body></html>".into(),
                url: None,
                detailed_analysis: false,
            }))
            .await;
        assert!(!response.success);
        assert_eq!(
            response.error.unwrap(),
            WizardError::ExtractionEmpty.to_string()
        );
        assert_eq!(
            response.notice.unwrap(),
            Notice::error(WizardError::ExtractionEmpty.to_string())
        );
    }

    #[tokio::test]
    async fn test_set_and_get_api_key_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut host = Host::new(Config::default(), Some(path.clone()));

        let response = host
            .handle_raw(br#"{"action":"setApiKey","apiKey":"  sk-test-123  "}"#)
            .await;
        assert!(response.success);

        let response = host.handle(HostRequest::GetApiKey).await;
        assert_eq!(response.data.unwrap()["apiKey"], "sk-test-123");
        assert_eq!(Config::load_file(&path).unwrap().api_key(), Some("sk-test-123"));

        let response = host
            .handle(HostRequest::SetApiKey { api_key: " ".into() })
            .await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_test_api_key_without_any_key() {
        let mut host = local_host();
        let response = host.handle_raw(br#"{"action":"testApiKey"}"#).await;
        assert!(response.success);
        assert_eq!(response.data.unwrap()["valid"], false);
    }

    #[tokio::test]
    async fn test_insert_description() {
        let mut host = local_host();
        let response = host
            .handle(HostRequest::InsertDescription {
                html: COMPARE_PAGE.to_string(),
                text: "Title: Foo\n\nDescription:\nBar\nBaz".into(),
            })
            .await;
        let data = response.data.unwrap();
        assert_eq!(data["plan"]["body"]["value"], "Bar\nBaz");
    }
}
