//! Client for the vision-capable critique service.

use crate::config::{ApiKey, ServerConfig};
use crate::error::ApiError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Instruction sent alongside the image.
pub const CURATOR_PROMPT: &str = "この絵画を美術館の学芸員として分析してください。格調高いタイトルと、芸術的な観点からの解説文を日本語で提供してください。タイトルは「」で囲み、解説は200文字程度でお願いします。";

/// Boxed future for object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from the upstream service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("credential rejected")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response contained no text")]
    EmptyResponse,
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unauthorized => ApiError::UpstreamAuth,
            UpstreamError::RateLimited => ApiError::UpstreamRateLimit,
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Something that can critique a PNG.
pub trait ArtCritic: Send + Sync {
    /// Critique a base64-encoded PNG (no data URL prefix).
    ///
    /// The returned text starts with a quoted title line followed by
    /// commentary lines.
    fn critique(&self, image_base64: String) -> BoxFuture<'_, Result<String, UpstreamError>>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Critic backed by the Anthropic Messages API.
pub struct AnthropicCritic {
    client: reqwest::Client,
    api_key: ApiKey,
    url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicCritic {
    pub fn new(api_key: ApiKey, config: &ServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            url: config.upstream_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    async fn send(&self, image_base64: String) -> Result<String, UpstreamError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Text { text: CURATOR_PROMPT },
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: "image/png",
                            data: &image_base64,
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(UpstreamError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(UpstreamError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let parsed: MessagesResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or(UpstreamError::EmptyResponse)
    }
}

impl ArtCritic for AnthropicCritic {
    fn critique(&self, image_base64: String) -> BoxFuture<'_, Result<String, UpstreamError>> {
        Box::pin(self.send(image_base64))
    }
}
