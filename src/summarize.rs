use crate::error::{Error, Result};
use crate::types::Circular;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Review instructions sent ahead of the circular text
pub const REVIEW_TEMPLATE: &str = include_str!("prompts/regulatory_review.txt");

/// Text-in/text-out summarization service
pub trait Summarizer {
    fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Credentials and model selection for the summarization service
#[derive(Clone)]
pub struct SummarizerConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    /// No timeout unless set
    pub timeout: Option<Duration>,
}

impl SummarizerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the `generateContent` method for the configured model
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

// Keeps the API key out of debug output
impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Google Gemini `generateContent` client
pub struct GeminiSummarizer {
    config: SummarizerConfig,
    client: Client,
}

impl GeminiSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config(
                "No API key for the summarization service (set GEMINI_API_KEY or --api-key)".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl Summarizer for GeminiSummarizer {
    fn summarize(&self, prompt: &str) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.config.api_key.trim())
                .map_err(|_| Error::Config("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = %self.config.model, prompt_chars = prompt.len(), "calling generateContent");
        let resp = self
            .client
            .post(self.config.generate_url())
            .headers(headers)
            .json(&body)
            .send()
            .map_err(|e| Error::Summarization(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Summarization(format!("service returned {}: {}", status, text)));
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| Error::Summarization(format!("failed to parse response: {}", e)))?;
        parsed.into_text()
    }
}

/// Prompt for one circular: the review template followed by its text
pub fn build_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(REVIEW_TEMPLATE.len() + text.len());
    prompt.push_str(REVIEW_TEMPLATE);
    prompt.push_str(text);
    prompt
}

/// Summarize a selected circular
///
/// Fails with `MissingText` when the circular has no extracted text. Service
/// errors come back as `Summarization` and are never retried.
pub fn summarize_circular(summarizer: &dyn Summarizer, circular: &Circular) -> Result<String> {
    let text = circular
        .extracted_text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(Error::MissingText)?;
    let summary = summarizer.summarize(&build_prompt(text))?;
    info!(id = circular.id, summary_chars = summary.len(), "summary generated");
    Ok(summary)
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Summarization(format!("prompt was blocked: {}", reason)));
        }
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| Error::Summarization("response contained no candidates".to_string()))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(Error::Summarization("response contained no text".to_string()));
        }
        Ok(text)
    }
}
