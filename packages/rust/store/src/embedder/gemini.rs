//! Gemini embedding client (`batchEmbedContents`).

use std::time::Duration;

use coursepilot_shared::{CoursePilotError, Result};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;

/// Largest request the batch endpoint accepts.
const MAX_BATCH: usize = 100;

/// Embeddings client for the hosted Generative Language API.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    ///
    /// # Arguments
    /// * `api_key` - Value for the `x-goog-api-key` header
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    /// * `model` - Embedding model (e.g. `text-embedding-004`)
    /// * `dimensions` - Requested output width; blank inputs get a zero vector of this width
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(CoursePilotError::config("missing Gemini API key"));
        }
        if model.trim().is_empty() {
            return Err(CoursePilotError::config("missing embedding model name"));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| CoursePilotError::config("invalid Gemini API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| CoursePilotError::Embedding(format!("failed to build HTTP client: {e}")))?;

        let model = model.trim().trim_start_matches("models/").to_string();
        Ok(Self {
            endpoint: format!(
                "{}/models/{model}:batchEmbedContents",
                base_url.trim_end_matches('/')
            ),
            client,
            model,
            dimensions: dimensions.max(1),
        })
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = format!("models/{}", self.model);
        let request = BatchRequest {
            requests: inputs
                .iter()
                .map(|text| EmbedRequest {
                    model: &model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoursePilotError::Embedding(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(CoursePilotError::Embedding(format!(
                "embedding request failed ({status}): {body}"
            )));
        }

        let payload: BatchResponse = response
            .json()
            .await
            .map_err(|e| CoursePilotError::Embedding(format!("invalid embedding response: {e}")))?;

        if payload.embeddings.len() != inputs.len() {
            return Err(CoursePilotError::Embedding(format!(
                "embedder returned {} vectors for {} inputs",
                payload.embeddings.len(),
                inputs.len()
            )));
        }
        Ok(payload.embeddings.into_iter().map(|e| e.values).collect())
    }
}

impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];

        // The API rejects empty content, so blank inputs never leave the process.
        let pending: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter_map(|(i, t)| {
                if t.trim().is_empty() {
                    None
                } else {
                    Some((i, t.as_str()))
                }
            })
            .collect();

        for chunk in pending.chunks(MAX_BATCH) {
            let inputs: Vec<&str> = chunk.iter().map(|(_, t)| *t).collect();
            debug!(count = inputs.len(), model = %self.model, "requesting embeddings");
            let embedded = self.embed_batch(&inputs).await?;
            for ((idx, _), vector) in chunk.iter().zip(embedded) {
                vectors[*idx] = vector;
            }
        }

        for vector in vectors.iter_mut().filter(|v| v.is_empty()) {
            *vector = vec![0.0; self.dimensions];
        }
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    output_dimensionality: usize,
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
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
