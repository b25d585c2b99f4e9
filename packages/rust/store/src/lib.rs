//! Vector store gateway.
//!
//! [`VectorStore`] owns the lifecycle of a named collection: create-or-attach,
//! insert-with-identity, and cosine similarity queries. Every call is a live
//! round trip; nothing is cached locally.
//!
//! Implementations:
//! - [`ChromaStore`]: a remote Chroma server over HTTP
//! - [`MemoryStore`]: an in-process store with the same contract

pub mod chroma;
pub mod embedder;
pub mod memory;

use std::collections::BTreeMap;
use std::future::Future;

use coursepilot_shared::Result;

pub use chroma::ChromaStore;
pub use embedder::{AnyEmbedder, Embedder, GeminiEmbedder, HashingEmbedder};
pub use memory::MemoryStore;

/// Flat string metadata stored next to each embedding.
pub type Metadata = BTreeMap<String, String>;

/// An opened collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    /// Store-assigned collection id.
    pub id: String,
    /// Collection name as requested.
    pub name: String,
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    /// Document id.
    pub id: String,
    /// Cosine distance (`1 - similarity`); smaller is nearer.
    pub distance: f32,
    pub metadata: Metadata,
    /// Stored document text, when the store returns it.
    pub document: Option<String>,
}

impl QueryMatch {
    /// Cosine similarity of this hit to the query.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// A vector database holding named collections of text documents.
///
/// Transport failures are errors, never an empty result: an `Ok(vec![])`
/// from [`similarity_query`](Self::similarity_query) always means "no
/// documents".
pub trait VectorStore: Send + Sync {
    /// Check that the backing service is reachable.
    fn heartbeat(&self) -> impl Future<Output = Result<()>> + Send;

    /// Create the collection (cosine metric) if absent, attach to it if present.
    fn open_collection(&self, name: &str) -> impl Future<Output = Result<CollectionHandle>> + Send;

    /// Insert one document. An id already in the collection fails with the
    /// recoverable [`DuplicateDocument`](coursepilot_shared::CoursePilotError::DuplicateDocument).
    fn upsert(
        &self,
        handle: &CollectionHandle,
        document_id: &str,
        document_text: &str,
        metadata: &Metadata,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Up to `top_k` nearest documents, nearest first.
    fn similarity_query(
        &self,
        handle: &CollectionHandle,
        query_text: &str,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<QueryMatch>>> + Send;

    /// Number of documents in the collection.
    fn count(&self, handle: &CollectionHandle) -> impl Future<Output = Result<usize>> + Send;
}
