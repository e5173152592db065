use std::time::Duration;

use anyhow::{Context, Result};
use medrag_core::config::GenerationSettings;
use medrag_core::error::Error;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generator::{GenerateError, Generation, GenerationConfig, GenerativeModel, SafetySetting, Usage};

/// Gemini `generateContent` over HTTPS.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self { api_key, model, base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    /// Key from settings or `GOOGLE_API_KEY`.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = settings
            .resolve_api_key()
            .ok_or_else(|| Error::InvalidConfig("generation.api_key or GOOGLE_API_KEY must be set".into()))?;
        Self::new(
            api_key,
            settings.model.clone(),
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Generation, GenerateError> {
        let body = request_body(prompt, config);
        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.trim())])
            .json(&body)
            .send()
            .map_err(|e| GenerateError::Http(e.without_url().to_string()))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| GenerateError::Http(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(GenerateError::Status { status: status.as_u16(), body: text });
        }
        debug!(bytes = text.len(), "gemini response");
        parse_response(&text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: WireGenerationConfig<'a>,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

pub fn request_body<'a>(prompt: &'a str, config: &'a GenerationConfig) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
        generation_config: WireGenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: &config.response_mime_type,
        },
        safety_settings: &config.safety_settings,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

/// Text of the first candidate (all parts concatenated) plus usage counts.
pub fn parse_response(body: &str) -> Result<Generation, GenerateError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| GenerateError::Decode(e.to_string()))?;
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerateError::Blocked(reason));
    }
    let usage = parsed.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        candidate_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });
    let candidate = parsed.candidates.into_iter().next().ok_or(GenerateError::Empty)?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") => Err(GenerateError::Blocked("SAFETY".into())),
            _ => Err(GenerateError::Empty),
        };
    }
    Ok(Generation { text, usage })
}
