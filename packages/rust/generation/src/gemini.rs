//! Gemini `generateContent` client.

use std::time::Duration;

use coursepilot_shared::{CoursePilotError, GenerationConfig, Result, read_api_key};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{GenerationClient, SafetyPolicy, SafetySetting};

/// Client for a hosted Gemini model.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    safety: SafetyPolicy,
}

impl GeminiClient {
    /// Build a client for `config.model` with the default [`SafetyPolicy`].
    pub fn new(api_key: String, config: &GenerationConfig) -> Result<Self> {
        Self::with_safety(api_key, config, SafetyPolicy::default())
    }

    /// Read the API key from the env var named in config, then build.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = read_api_key(&config.api_key_env)?;
        Self::new(api_key, config)
    }

    pub fn with_safety(
        api_key: String,
        config: &GenerationConfig,
        safety: SafetyPolicy,
    ) -> Result<Self> {
        let model = config.model.trim().trim_start_matches("models/");
        if model.is_empty() {
            return Err(CoursePilotError::config("generation.model must not be empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| CoursePilotError::config("invalid Gemini API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                CoursePilotError::GenerationUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{model}:generateContent",
                config.base_url.trim_end_matches('/')
            ),
            model: model.to_string(),
            safety,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl GenerationClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            safety_settings: self.safety.settings(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoursePilotError::GenerationUnavailable(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(CoursePilotError::GenerationUnavailable(format!(
                "model request failed ({status}): {body}"
            )));
        }

        let payload: GenerateResponse = response.json().await.map_err(|e| {
            CoursePilotError::GenerationUnavailable(format!("invalid model response: {e}"))
        })?;

        let text = payload.text();
        if text.is_empty() {
            let reason = payload
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            warn!(%reason, "model returned no text");
            return Err(CoursePilotError::GenerationUnavailable(format!(
                "model returned no text ({reason})"
            )));
        }

        debug!(response_chars = text.len(), "generation complete");
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    safety_settings: &'a [SafetySetting],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
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
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Text parts of the first candidate that has any, concatenated and trimmed.
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .find(|text| !text.trim().is_empty())
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
