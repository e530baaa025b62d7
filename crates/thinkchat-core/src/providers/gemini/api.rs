//! Gemini API key provider (Generative Language API).

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};

use super::sse::GeminiSseParser;
use crate::providers::shared::{classify_reqwest_error, resolve_api_key, resolve_base_url};
use crate::providers::{
    ChatContentBlock, ChatMessage, MessageContent, ProviderError, ProviderStream,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: Option<u32>,
}

impl GeminiConfig {
    /// Creates a new config from environment.
    ///
    /// Authentication resolution order:
    /// 1. `config_api_key` parameter (from config file)
    /// 2. `GEMINI_API_KEY` environment variable
    ///
    /// Environment variables:
    /// - `GEMINI_API_KEY` (fallback if not in config)
    /// - `GEMINI_BASE_URL` (optional)
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn from_env(
        model: String,
        max_output_tokens: Option<u32>,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "GEMINI_API_KEY", "gemini")?;
        let base_url = resolve_base_url(
            config_base_url,
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            max_output_tokens,
        })
    }
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

/// A generated image from Gemini image models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Parsed response from an image generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerateImageResponse {
    pub images: Vec<GeneratedImage>,
    pub text_parts: Vec<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Opens a streaming chat request.
    ///
    /// # Errors
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    pub async fn send_messages_stream(
        &self,
        messages: &[ChatMessage],
        system: Option<&str>,
    ) -> Result<ProviderStream> {
        use futures_util::StreamExt;

        let request = build_generate_request(messages, system, self.config.max_output_tokens);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        );
        let headers = build_headers(&self.config.api_key);

        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body).into());
        }

        let event_stream = GeminiSseParser::new(response.bytes_stream(), self.config.model.clone());
        Ok(event_stream.boxed())
    }

    /// Generates image content using an image-capable model.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn generate_image(&self, model: &str, prompt: &str) -> Result<GenerateImageResponse> {
        let request = build_image_generation_request(prompt);
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        let headers = build_json_headers(&self.config.api_key);

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }

        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Gemini image response JSON: {body}"))?;
        parse_image_generation_response(&value)
    }
}

fn build_generate_request(
    messages: &[ChatMessage],
    system: Option<&str>,
    max_output_tokens: Option<u32>,
) -> Value {
    let contents: Vec<Value> = messages.iter().map(message_to_content).collect();

    let mut request = json!({
        "contents": contents,
    });

    if let Some(prompt) = system
        && !prompt.trim().is_empty()
    {
        request["system_instruction"] = json!({
            "parts": [{"text": prompt}]
        });
    }

    if let Some(max) = max_output_tokens
        && max > 0
    {
        request["generationConfig"] = json!({ "maxOutputTokens": max });
    }

    request
}

fn message_to_content(message: &ChatMessage) -> Value {
    let parts: Vec<Value> = match &message.content {
        MessageContent::Text(text) => vec![json!({ "text": text })],
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|block| match block {
                ChatContentBlock::Text(text) => json!({ "text": text }),
                ChatContentBlock::InlineData { mime_type, data } => json!({
                    "inlineData": { "mimeType": mime_type, "data": data }
                }),
            })
            .collect(),
    };

    json!({ "role": message.role, "parts": parts })
}

fn build_image_generation_request(prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{
                "text": prompt
            }]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"]
        },
    })
}

fn parse_image_generation_response(value: &Value) -> Result<GenerateImageResponse> {
    let payload = value.get("response").unwrap_or(value);
    let mut images = Vec::new();
    let mut text_parts = Vec::new();

    let candidates = payload
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str)
                && !text.trim().is_empty()
            {
                text_parts.push(text.to_string());
            }

            let Some(inline_data) = part.get("inlineData").or_else(|| part.get("inline_data"))
            else {
                continue;
            };

            let mime_type = inline_data
                .get("mimeType")
                .or_else(|| inline_data.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png")
                .to_string();

            let data_b64 = inline_data
                .get("data")
                .and_then(Value::as_str)
                .context("Gemini image response is missing inlineData.data")?;

            let data = base64::engine::general_purpose::STANDARD
                .decode(data_b64)
                .with_context(|| format!("Failed to decode base64 image data ({mime_type})"))?;

            images.push(GeneratedImage { mime_type, data });
        }
    }

    Ok(GenerateImageResponse { images, text_parts })
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("text/event-stream"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(
        "user-agent",
        HeaderValue::from_static(crate::providers::shared::USER_AGENT),
    );
    headers
}

fn build_json_headers(api_key: &str) -> HeaderMap {
    let mut headers = build_headers(api_key);
    headers.insert("accept", HeaderValue::from_static("application/json"));
    headers
}
