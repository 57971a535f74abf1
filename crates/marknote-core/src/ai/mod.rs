//! AI text helpers.
//!
//! Requests go straight to the configured provider: OpenAI-compatible chat
//! completions (OpenAI, DeepSeek) or Anthropic messages. Both the whole
//! response and server-sent-event streaming are supported.

mod prompts;
mod sse;

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

pub use prompts::{
    detect_trigger, insert_reply, AiTask, AiTrigger, ChatMessage, Role, TriggerKind,
};
pub use sse::{SseDecoder, SseEvent};

use crate::error::{Error, Result};
use crate::models::{AiProvider, Settings};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2_000;

/// Client for one provider/model/key combination.
#[derive(Clone)]
pub struct AiClient {
    provider: AiProvider,
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl fmt::Debug for AiClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AiClient")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AiClient {
    /// Build a client from the AI fields of `settings`.
    pub fn from_settings(settings: &Settings, timeout: Duration) -> Result<Self> {
        let api_key = normalize_text_option(settings.ai_api_key.clone())
            .ok_or_else(|| Error::Ai("AI API key is not configured".to_string()))?;

        let base_url = normalize_text_option(settings.ai_base_url.clone())
            .unwrap_or_else(|| settings.ai_provider.default_base_url().to_string());
        if !is_http_url(&base_url) {
            return Err(Error::Ai(
                "AI base URL must include http:// or https://".to_string(),
            ));
        }
        let base_url = base_url.trim_end_matches('/');
        let base_url = base_url.strip_suffix("/v1").unwrap_or(base_url).to_string();

        let model = normalize_text_option(Some(settings.ai_model.clone()))
            .unwrap_or_else(|| settings.ai_provider.default_model().to_string());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Ai(error.to_string()))?;

        Ok(Self {
            provider: settings.ai_provider,
            api_key,
            base_url,
            model,
            client,
        })
    }

    pub const fn provider(&self) -> AiProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run `task` on `text` and return the whole reply.
    pub async fn run(&self, task: &AiTask, text: &str) -> Result<String> {
        self.complete(&task.messages(text)).await
    }

    /// Send `messages` and wait for the complete reply.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.send(messages, false).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|error| Error::Ai(format!("invalid response body: {error}")))?;

        let text = match self.provider {
            AiProvider::OpenAi | AiProvider::DeepSeek => payload
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str),
            AiProvider::Anthropic => payload.pointer("/content/0/text").and_then(Value::as_str),
        };
        text.map(ToString::to_string)
            .ok_or_else(|| Error::Ai("response did not contain any text".to_string()))
    }

    /// Stream the reply, calling `on_chunk` with every text delta.
    ///
    /// Returns the concatenated reply.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        mut on_chunk: impl FnMut(&str) + Send,
    ) -> Result<String> {
        let mut response = self.send(messages, true).await?;
        let mut decoder = SseDecoder::new();
        let mut reply = String::new();

        'stream: while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| Error::Ai(format!("stream interrupted: {error}")))?
        {
            for event in decoder.feed(&chunk) {
                match self.handle_event(event) {
                    StreamStep::Text(text) => {
                        on_chunk(&text);
                        reply.push_str(&text);
                    }
                    StreamStep::Skip => {}
                    StreamStep::Done => break 'stream,
                }
            }
        }
        if let Some(StreamStep::Text(text)) = decoder.finish().map(|event| self.handle_event(event))
        {
            on_chunk(&text);
            reply.push_str(&text);
        }

        Ok(reply)
    }

    fn handle_event(&self, event: SseEvent) -> StreamStep {
        let SseEvent::Data(data) = event else {
            return StreamStep::Done;
        };
        let Ok(payload) = serde_json::from_str::<Value>(&data) else {
            tracing::debug!("Skipping unparsable stream event");
            return StreamStep::Skip;
        };

        let text = match self.provider {
            AiProvider::OpenAi | AiProvider::DeepSeek => payload
                .pointer("/choices/0/delta/content")
                .and_then(Value::as_str),
            AiProvider::Anthropic => {
                if payload.get("type").and_then(Value::as_str) == Some("message_stop") {
                    return StreamStep::Done;
                }
                payload.pointer("/delta/text").and_then(Value::as_str)
            }
        };
        match text {
            Some(text) if !text.is_empty() => StreamStep::Text(text.to_string()),
            _ => StreamStep::Skip,
        }
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let request = match self.provider {
            AiProvider::OpenAi | AiProvider::DeepSeek => self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "model": self.model,
                    "messages": messages,
                    "temperature": TEMPERATURE,
                    "max_tokens": MAX_TOKENS,
                    "stream": stream,
                })),
            AiProvider::Anthropic => {
                let system = messages
                    .iter()
                    .filter(|message| message.role == Role::System)
                    .map(|message| message.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let conversation: Vec<&ChatMessage> = messages
                    .iter()
                    .filter(|message| message.role != Role::System)
                    .collect();
                self.client
                    .post(format!("{}/v1/messages", self.base_url))
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&json!({
                        "model": self.model,
                        "system": system,
                        "messages": conversation,
                        "max_tokens": MAX_TOKENS,
                        "stream": stream,
                    }))
            }
        };

        tracing::debug!(
            "Sending {} request to {} (stream: {stream})",
            self.provider,
            self.base_url
        );
        let response = request
            .send()
            .await
            .map_err(|error| Error::Ai(format!("request failed: {error}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Ai(parse_provider_error(status, &body)))
        }
    }
}

enum StreamStep {
    Text(String),
    Skip,
    Done,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: Option<String>,
}

fn parse_provider_error(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| compact_text(body));
    if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", message.trim(), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn settings(provider: AiProvider, base_url: &str) -> Settings {
        Settings {
            ai_provider: provider,
            ai_api_key: Some("sk-test".into()),
            ai_base_url: Some(base_url.to_string()),
            ai_model: provider.default_model().to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let settings = Settings::default();
        let error = AiClient::from_settings(&settings, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(error, Error::Ai(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let client = AiClient::from_settings(
            &settings(AiProvider::OpenAi, "https://api.openai.com/v1/"),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("https://api.openai.com\""));
    }

    #[test]
    fn provider_error_message_is_extracted() {
        assert_eq!(
            parse_provider_error(
                StatusCode::UNAUTHORIZED,
                r#"{"error":{"message":"Incorrect API key"}}"#
            ),
            "Incorrect API key (401)"
        );
        assert_eq!(parse_provider_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[tokio::test]
    async fn openai_completion_returns_message_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer sk-test"
                );
                assert_eq!(body["stream"], false);
                assert_eq!(body["messages"][0]["role"], "system");
                Json(json!({"choices": [{"message": {"content": "A short summary."}}]}))
            }),
        );
        let base = serve(router).await;
        let client = AiClient::from_settings(
            &settings(AiProvider::OpenAi, &base),
            Duration::from_secs(5),
        )
        .unwrap();

        let reply = client.run(&AiTask::Summarize, "long text").await.unwrap();
        assert_eq!(reply, "A short summary.");
    }

    #[tokio::test]
    async fn openai_stream_concatenates_deltas() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{}}]}\n\n",
                    "data: [DONE]\n\n",
                )
            }),
        );
        let base = serve(router).await;
        let client = AiClient::from_settings(
            &settings(AiProvider::DeepSeek, &base),
            Duration::from_secs(5),
        )
        .unwrap();

        let mut chunks = Vec::new();
        let reply = client
            .complete_stream(&AiTask::Chat.messages("hi"), |chunk| {
                chunks.push(chunk.to_string());
            })
            .await
            .unwrap();
        assert_eq!(reply, "Hello");
        assert_eq!(chunks, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn anthropic_request_separates_system_prompt() {
        let router = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers.get("x-api-key").unwrap(), "sk-test");
                assert_eq!(headers.get("anthropic-version").unwrap(), ANTHROPIC_VERSION);
                assert!(body["system"].as_str().unwrap().contains("translator"));
                assert_eq!(body["messages"].as_array().unwrap().len(), 1);
                Json(json!({"content": [{"type": "text", "text": "Bonjour"}]}))
            }),
        );
        let base = serve(router).await;
        let client = AiClient::from_settings(
            &settings(AiProvider::Anthropic, &base),
            Duration::from_secs(5),
        )
        .unwrap();

        let task = AiTask::Translate {
            target_language: "French".into(),
        };
        assert_eq!(client.run(&task, "Hello").await.unwrap(), "Bonjour");
    }

    #[tokio::test]
    async fn provider_errors_surface_as_ai_errors() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"message": "bad key"}})),
                )
            }),
        );
        let base = serve(router).await;
        let client = AiClient::from_settings(
            &settings(AiProvider::OpenAi, &base),
            Duration::from_secs(5),
        )
        .unwrap();

        let error = client.run(&AiTask::Improve, "text").await.unwrap_err();
        assert_eq!(error.to_string(), "AI error: bad key (401)");
    }
}
