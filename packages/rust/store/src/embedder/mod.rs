//! Text → vector embedders used by the stores.

mod gemini;
mod hashing;

use std::future::Future;
use std::time::Duration;

use coursepilot_shared::{EmbeddingConfig, EmbeddingProvider, Result, read_api_key};

pub use gemini::GeminiEmbedder;
pub use hashing::HashingEmbedder;

/// Turns texts into fixed-width vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

/// Embed a single text.
pub(crate) async fn embed_one<E: Embedder>(embedder: &E, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embedder.embed(&[text.to_string()]).await?;
    vectors.pop().ok_or_else(|| {
        coursepilot_shared::CoursePilotError::Embedding("embedder returned no vector".into())
    })
}

/// Embedder selected at runtime from configuration.
#[derive(Clone)]
pub enum AnyEmbedder {
    Gemini(GeminiEmbedder),
    Hashing(HashingEmbedder),
}

impl AnyEmbedder {
    /// Build the configured embedder. The Gemini provider reads its API key
    /// from the env var named in config.
    pub fn from_config(config: &EmbeddingConfig, timeout: Duration) -> Result<Self> {
        match config.provider {
            EmbeddingProvider::Gemini => {
                let api_key = read_api_key(&config.api_key_env)?;
                Ok(Self::Gemini(GeminiEmbedder::new(
                    api_key,
                    &config.base_url,
                    &config.model,
                    config.dimensions,
                    timeout,
                )?))
            }
            EmbeddingProvider::Hashing => Ok(Self::Hashing(HashingEmbedder::new(config.dimensions))),
        }
    }
}

impl Embedder for AnyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Gemini(e) => e.embed(texts).await,
            Self::Hashing(e) => e.embed(texts).await,
        }
    }
}

/// Cosine similarity; zero vectors are orthogonal to everything.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn hashing_provider_needs_no_key() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hashing,
            dimensions: 64,
            ..Default::default()
        };
        let embedder = AnyEmbedder::from_config(&config, Duration::from_secs(1)).expect("build");
        assert!(matches!(embedder, AnyEmbedder::Hashing(_)));
    }
}
