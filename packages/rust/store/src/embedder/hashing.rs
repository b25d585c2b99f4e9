//! Offline feature-hashing embedder.

use coursepilot_shared::Result;
use sha2::{Digest, Sha256};

use super::Embedder;

/// Bag-of-words embedder: each lowercase alphanumeric token is hashed to a
/// signed bucket, and the result is L2-normalized.
///
/// Deterministic across processes and platforms, so vectors written by one
/// ingestion run are comparable with queries from any later one.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_be_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::cosine_similarity;

    #[test]
    fn vectors_are_unit_length() {
        let v = HashingEmbedder::new(32).embed_text("machine learning systems");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn blank_text_is_zero_vector() {
        let v = HashingEmbedder::new(16).embed_text("   ");
        assert_eq!(v, vec![0.0; 16]);
    }

    #[test]
    fn deterministic_and_case_insensitive() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_text("Network Security"), e.embed_text("network security"));
    }

    #[test]
    fn shared_tokens_are_closer() {
        let e = HashingEmbedder::new(1024);
        let query = e.embed_text("computer security");
        let near = e.embed_text("network security cryptography");
        let far = e.embed_text("medieval poetry");
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn embed_keeps_input_order() {
        let e = HashingEmbedder::new(8);
        let out = e.embed(&["a".into(), "b".into()]).await.expect("embed");
        assert_eq!(out[0], e.embed_text("a"));
        assert_eq!(out[1], e.embed_text("b"));
    }
}
