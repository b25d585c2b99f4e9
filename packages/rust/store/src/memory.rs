//! In-process vector store.
//!
//! Same contract as [`ChromaStore`](crate::ChromaStore), brute-force cosine
//! search. Used for offline runs and as the store in pipeline tests.

use std::collections::HashMap;
use std::sync::RwLock;

use coursepilot_shared::{CoursePilotError, Result};
use tracing::debug;
use uuid::Uuid;

use crate::embedder::{Embedder, cosine_similarity, embed_one};
use crate::{CollectionHandle, Metadata, QueryMatch, VectorStore};

struct Entry {
    id: String,
    embedding: Vec<f32>,
    document: String,
    metadata: Metadata,
}

struct Collection {
    id: String,
    entries: Vec<Entry>,
}

/// Vector store held entirely in memory.
pub struct MemoryStore<E> {
    embedder: E,
    collections: RwLock<HashMap<String, Collection>>,
}

impl<E: Embedder> MemoryStore<E> {
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> CoursePilotError {
        CoursePilotError::StoreUnavailable("in-memory store lock poisoned".into())
    }

    fn unknown(handle: &CollectionHandle) -> CoursePilotError {
        CoursePilotError::StoreUnavailable(format!("collection '{}' does not exist", handle.name))
    }
}

impl<E: Embedder> VectorStore for MemoryStore<E> {
    async fn heartbeat(&self) -> Result<()> {
        Ok(())
    }

    async fn open_collection(&self, name: &str) -> Result<CollectionHandle> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let collection = collections.entry(name.to_string()).or_insert_with(|| {
            debug!(name, "creating in-memory collection");
            Collection {
                id: Uuid::new_v4().to_string(),
                entries: Vec::new(),
            }
        });
        Ok(CollectionHandle {
            id: collection.id.clone(),
            name: name.to_string(),
        })
    }

    async fn upsert(
        &self,
        handle: &CollectionHandle,
        document_id: &str,
        document_text: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        {
            let collections = self.collections.read().map_err(|_| Self::poisoned())?;
            let collection = collections.get(&handle.name).ok_or_else(|| Self::unknown(handle))?;
            if collection.entries.iter().any(|e| e.id == document_id) {
                return Err(CoursePilotError::duplicate(document_id));
            }
        }

        let embedding = embed_one(&self.embedder, document_text).await?;

        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let collection = collections
            .get_mut(&handle.name)
            .ok_or_else(|| Self::unknown(handle))?;
        // Re-check: another writer may have inserted while we were embedding.
        if collection.entries.iter().any(|e| e.id == document_id) {
            return Err(CoursePilotError::duplicate(document_id));
        }
        collection.entries.push(Entry {
            id: document_id.to_string(),
            embedding,
            document: document_text.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    async fn similarity_query(
        &self,
        handle: &CollectionHandle,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 || self.count(handle).await? == 0 {
            return Ok(Vec::new());
        }

        let query = embed_one(&self.embedder, query_text).await?;

        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let collection = collections.get(&handle.name).ok_or_else(|| Self::unknown(handle))?;

        let mut scored: Vec<(f32, &Entry)> = collection
            .entries
            .iter()
            .map(|e| (1.0 - cosine_similarity(&query, &e.embedding), e))
            .collect();
        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, e)| QueryMatch {
                id: e.id.clone(),
                distance,
                metadata: e.metadata.clone(),
                document: Some(e.document.clone()),
            })
            .collect())
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let collection = collections.get(&handle.name).ok_or_else(|| Self::unknown(handle))?;
        Ok(collection.entries.len())
    }
}
