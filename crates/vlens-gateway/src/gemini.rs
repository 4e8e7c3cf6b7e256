//! Gemini `generateContent` transport.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, TransportError};
use crate::request::{InferenceRequest, Payload, ResponseFormat};
use crate::transport::{InferenceTransport, TransportReply};

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// HTTP transport for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl GeminiTransport {
    /// Create a transport from gateway config.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        if config.api_key.is_empty() {
            return Err(GatewayError::config("Gemini API key is empty"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_body(request: &InferenceRequest) -> GeminiRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Payload::Text(text) => Part::Text { text: text.clone() },
                Payload::Image { mime, bytes } | Payload::Audio { mime, bytes } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime.clone(),
                        data: BASE64.encode(bytes),
                    },
                },
            })
            .collect();

        GeminiRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                response_mime_type: match request.response_format {
                    ResponseFormat::Text => "text/plain",
                    ResponseFormat::Json => "application/json",
                },
            },
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl InferenceTransport for GeminiTransport {
    async fn send(&self, model: &str, request: &InferenceRequest) -> Result<TransportReply, TransportError> {
        let body = Self::build_body(request);

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let header_hint = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_header);
            let text = response.text().await.unwrap_or_default();
            let retry_after = header_hint.or_else(|| parse_retry_delay_body(&text));
            debug!(status = status.as_u16(), model, "Gemini request failed");
            return Err(TransportError::from_http_status(status.as_u16(), text, retry_after));
        }

        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_reply(&text)
    }
}

/// Parse a successful response body.
fn parse_reply(body: &str) -> Result<TransportReply, TransportError> {
    let parsed: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| TransportError::InvalidResponse(format!("Malformed Gemini response: {}", e)))?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Ok(TransportReply::blocked(reason));
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::InvalidResponse("No candidates in response".to_string()))?;

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
    {
        return Ok(TransportReply::blocked(reason));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TransportError::InvalidResponse("Empty response text".to_string()));
    }

    Ok(TransportReply::text(text))
}

/// `Retry-After` in delta-seconds form.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<f64>().ok().filter(|s| *s >= 0.0).map(Duration::from_secs_f64)
}

/// `RetryInfo.retryDelay` from a Google API error body, e.g. `"12s"`.
fn parse_retry_delay_body(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/details")?
        .as_array()?
        .iter()
        .filter_map(|d| d.get("retryDelay").and_then(|v| v.as_str()))
        .find_map(|s| parse_retry_after_header(s.trim_end_matches('s')))
}
