//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InferenceError, InferenceResult};
use crate::types::{ChatMessage, CompletionRequest, ContentPart, Role};

/// Text-completion provider used by the analysis pipeline.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one completion and return the model's text output.
    async fn complete(&self, request: CompletionRequest) -> InferenceResult<String>;
}

/// Inference client configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL up to and including the API version, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl InferenceConfig {
    /// Load from `OPENAI_API_KEY`, `INFERENCE_BASE_URL` and `INFERENCE_TIMEOUT`.
    pub fn from_env() -> InferenceResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| InferenceError::config("OPENAI_API_KEY not set"))?;

        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("INFERENCE_BASE_URL").unwrap_or(defaults.base_url),
            api_key,
            timeout: Duration::from_secs(
                std::env::var("INFERENCE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.timeout.as_secs()),
            ),
        })
    }
}

/// HTTP client for `/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: InferenceConfig,
}

impl OpenAiClient {
    pub fn new(config: InferenceConfig) -> InferenceResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(InferenceError::config("API key is empty"));
        }

        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        Self::new(InferenceConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> InferenceResult<String> {
        let body = WireRequest::from(&request);
        debug!(
            model = %request.model,
            json_mode = request.json_mode,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::from_http_status(status.as_u16(), error_text));
        }

        let parsed: WireResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InferenceError::invalid_response("No content in completion response"))
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: WireContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<WirePart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

impl<'a> From<&'a CompletionRequest> for WireRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        let content = match message.content.as_slice() {
            [ContentPart::Text(text)] => WireContent::Text(text),
            parts => WireContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => WirePart::Text { text },
                        ContentPart::ImageDataUrl(url) => WirePart::ImageUrl {
                            image_url: ImageUrl { url },
                        },
                    })
                    .collect(),
            ),
        };

        Self {
            role: message.role,
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(InferenceConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn test_complete_with_image_and_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 500,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": [
                        { "type": "text", "text": "describe" },
                        { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AQI=" } }
                    ]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let request = CompletionRequest::new(
            "gpt-4o-mini",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user(vec![ContentPart::text("describe"), ContentPart::jpeg(&[1, 2])]),
            ],
            500,
        )
        .json_mode(true);

        let text = client_for(&server).complete(request).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_plain_mode_omits_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hello")))
            .mount(&server)
            .await;

        let request = CompletionRequest::new("m", vec![ChatMessage::user_text("hi")], 10);
        client_for(&server).complete(request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new("m", vec![ChatMessage::user_text("hi")], 10))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::RateLimited(_)));
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_server_error_is_not_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new("m", vec![ChatMessage::user_text("hi")], 10))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Api { status: 500, .. }));
        assert!(!err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(CompletionRequest::new("m", vec![ChatMessage::user_text("hi")], 10))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = OpenAiClient::new(InferenceConfig::default()).unwrap_err();
        assert!(matches!(err, InferenceError::Config(_)));
    }
}
