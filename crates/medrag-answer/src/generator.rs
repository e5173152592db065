//! Prompted answer generation with a guaranteed reply.
//!
//! The generative model is a collaborator behind [`GenerativeModel`]; any
//! failure or empty output is turned into the configured fallback message.

use std::sync::Arc;
use std::time::{Duration, Instant};

use medrag_core::config::GenerationSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::prompt::PromptTemplate;

pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerationConfig {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            response_mime_type: settings.response_mime_type.clone(),
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|c| SafetySetting { category: (*c).to_string(), threshold: settings.safety_threshold.clone() })
                .collect(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from_settings(&GenerationSettings::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub candidate_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("response blocked: {0}")]
    Blocked(String),
    #[error("model returned no text")]
    Empty,
}

pub trait GenerativeModel: Send + Sync {
    fn model_name(&self) -> &str;
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Generation, GenerateError>;
}

/// A reply for the user. `fallback` marks replies that did not come from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub fallback: bool,
    pub usage: Option<Usage>,
    pub latency: Duration,
}

pub struct AnswerGenerator {
    model: Arc<dyn GenerativeModel>,
    template: PromptTemplate,
    config: GenerationConfig,
    fallback_message: String,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, settings: &GenerationSettings) -> Self {
        Self {
            model,
            template: PromptTemplate::from_settings(settings),
            config: GenerationConfig::from_settings(settings),
            fallback_message: settings.fallback_message.clone(),
        }
    }

    pub fn prompt(&self, question: &str, context: &str) -> String {
        self.template.render(context, question)
    }

    pub fn fallback(&self) -> Answer {
        Answer { text: self.fallback_message.clone(), fallback: true, usage: None, latency: Duration::ZERO }
    }

    /// Never fails: model errors and empty replies become the fallback.
    pub fn generate(&self, question: &str, context: &str) -> Answer {
        let prompt = self.prompt(question, context);
        let start = Instant::now();
        let result = self.model.generate(&prompt, &self.config);
        let latency = start.elapsed();
        match result {
            Ok(generation) if !generation.text.trim().is_empty() => {
                let usage = generation.usage.unwrap_or_default();
                info!(
                    model = self.model.model_name(),
                    latency_ms = latency.as_millis() as u64,
                    prompt_tokens = usage.prompt_tokens,
                    candidate_tokens = usage.candidate_tokens,
                    total_tokens = usage.total_tokens,
                    "answer generated"
                );
                Answer { text: generation.text.trim().to_string(), fallback: false, usage: generation.usage, latency }
            }
            Ok(_) => {
                warn!(
                    model = self.model.model_name(),
                    latency_ms = latency.as_millis() as u64,
                    "empty reply, using fallback"
                );
                Answer { latency, ..self.fallback() }
            }
            Err(e) => {
                warn!(
                    model = self.model.model_name(),
                    latency_ms = latency.as_millis() as u64,
                    error = %e,
                    "generation failed, using fallback"
                );
                Answer { latency, ..self.fallback() }
            }
        }
    }
}
