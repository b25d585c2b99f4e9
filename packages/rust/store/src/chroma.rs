//! Chroma HTTP client (`/api/v1`).
//!
//! Embeddings are computed client-side by the configured [`Embedder`] and
//! sent alongside documents; the server only stores and searches vectors.

use std::time::Duration;

use coursepilot_shared::{CoursePilotError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::embedder::{Embedder, embed_one};
use crate::{CollectionHandle, Metadata, QueryMatch, VectorStore};

/// Distance function requested for every collection we create.
const DISTANCE_SPACE: &str = "cosine";

/// Collection metadata key selecting the HNSW distance function.
const SPACE_KEY: &str = "hnsw:space";

/// User-Agent string for store requests.
const USER_AGENT: &str = concat!("CoursePilot/", env!("CARGO_PKG_VERSION"));

/// Vector store backed by a remote Chroma server.
pub struct ChromaStore<E> {
    client: Client,
    base_url: String,
    embedder: E,
}

impl<E: Embedder> ChromaStore<E> {
    /// Connect to the server at `endpoint` (e.g. `http://127.0.0.1:8000`).
    ///
    /// No request is made here; use [`VectorStore::heartbeat`] to probe.
    pub fn new(endpoint: &str, timeout: Duration, embedder: E) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            CoursePilotError::config(format!("invalid vector store endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoursePilotError::config(format!(
                "vector store endpoint must be http(s): {endpoint}"
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CoursePilotError::StoreUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            embedder,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoursePilotError::StoreUnavailable(format!("{url}: {e}")))?;
        ensure_success(&url, response).await
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoursePilotError::StoreUnavailable(format!("{url}: {e}")))?;
        ensure_success(&url, response).await
    }

    async fn contains(&self, handle: &CollectionHandle, document_id: &str) -> Result<bool> {
        let body = GetRequest {
            ids: [document_id],
            include: [],
        };
        let response = self
            .post_json(&format!("collections/{}/get", handle.id), &body)
            .await?;
        let found: GetResponse = decode(response).await?;
        Ok(found.ids.iter().any(|id| id == document_id))
    }
}

impl<E: Embedder> VectorStore for ChromaStore<E> {
    async fn heartbeat(&self) -> Result<()> {
        self.get("heartbeat").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn open_collection(&self, name: &str) -> Result<CollectionHandle> {
        let body = CreateCollectionRequest {
            name,
            metadata: Metadata::from([(SPACE_KEY.to_string(), DISTANCE_SPACE.to_string())]),
            get_or_create: true,
        };
        let response = self.post_json("collections", &body).await?;
        let collection: CollectionResponse = decode(response).await?;

        let space = collection
            .metadata
            .as_ref()
            .and_then(|m| m.get(SPACE_KEY))
            .and_then(serde_json::Value::as_str);
        if space != Some(DISTANCE_SPACE) {
            // Chroma ignores metadata for collections that already exist.
            warn!(
                collection = name,
                space = space.unwrap_or("l2"),
                "existing collection does not use cosine distance"
            );
        }

        info!(collection = name, id = %collection.id, "collection ready");
        Ok(CollectionHandle {
            id: collection.id,
            name: collection.name,
        })
    }

    #[instrument(skip(self, handle, document_text, metadata), fields(collection = %handle.name))]
    async fn upsert(
        &self,
        handle: &CollectionHandle,
        document_id: &str,
        document_text: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        // `add` on some server versions silently ignores existing ids, so ask first.
        if self.contains(handle, document_id).await? {
            return Err(CoursePilotError::duplicate(document_id));
        }

        let embedding = embed_one(&self.embedder, document_text).await?;
        let body = AddRequest {
            ids: [document_id],
            embeddings: [embedding.as_slice()],
            metadatas: [metadata],
            documents: [document_text],
        };

        match self
            .post_json(&format!("collections/{}/add", handle.id), &body)
            .await
        {
            Ok(_) => {
                debug!("document added");
                Ok(())
            }
            Err(CoursePilotError::StoreUnavailable(message)) if mentions_existing_id(&message) => {
                Err(CoursePilotError::duplicate(document_id))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, handle, query_text), fields(collection = %handle.name))]
    async fn similarity_query(
        &self,
        handle: &CollectionHandle,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let available = self.count(handle).await?;
        if available == 0 {
            debug!("collection is empty");
            return Ok(Vec::new());
        }

        let embedding = embed_one(&self.embedder, query_text).await?;
        let body = QueryRequest {
            query_embeddings: [embedding.as_slice()],
            n_results: top_k.min(available),
            include: ["metadatas", "documents", "distances"],
        };
        let response = self
            .post_json(&format!("collections/{}/query", handle.id), &body)
            .await?;
        let result: QueryResponse = decode(response).await?;

        let matches = result.into_matches();
        debug!(hits = matches.len(), "query complete");
        Ok(matches)
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        let response = self.get(&format!("collections/{}/count", handle.id)).await?;
        decode(response).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Turn a non-2xx response into `StoreUnavailable`, keeping the server's message.
async fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(CoursePilotError::StoreUnavailable(format!(
        "{url}: HTTP {status}: {body}"
    )))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    response
        .json()
        .await
        .map_err(|e| CoursePilotError::StoreUnavailable(format!("{url}: unexpected response: {e}")))
}

fn mentions_existing_id(message: &str) -> bool {
    message.contains("IDAlreadyExists")
        || message.contains("DuplicateID")
        || message.to_ascii_lowercase().contains("already exists")
}

/// Chroma metadata values may be strings, numbers, or booleans.
fn metadata_from_json(map: serde_json::Map<String, serde_json::Value>) -> Metadata {
    map.into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            serde_json::Value::Null => None,
            other => Some((k, other.to_string())),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: Metadata,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
    name: String,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct GetRequest<'a> {
    ids: [&'a str; 1],
    include: [&'static str; 0],
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
    metadatas: [&'a Metadata; 1],
    documents: [&'a str; 1],
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

/// Query results are nested one level per query embedding; we send one.
#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<serde_json::Map<String, serde_json::Value>>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

impl QueryResponse {
    fn into_matches(self) -> Vec<QueryMatch> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut metadatas = self
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut documents = self
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        ids.into_iter()
            .map(|id| QueryMatch {
                id,
                distance: distances.next().flatten().unwrap_or(f32::MAX),
                metadata: metadatas
                    .next()
                    .flatten()
                    .map(metadata_from_json)
                    .unwrap_or_default(),
                document: documents.next().flatten(),
            })
            .collect()
    }
}
