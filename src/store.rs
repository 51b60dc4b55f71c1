//! Store bootstrapper: owns the vector-store connection and the embedding model,
//! and guarantees the target collection exists before anything is read or written.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::Distance;
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::splitter::Chunk;

/// A vector with the chunk it was computed from, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub source: Option<String>,
    pub page: Option<u32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub source: Option<String>,
    pub score: f32,
}

/// The operations the pipeline needs from a vector database.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn collection_names(&self) -> Result<Vec<String>>;
    async fn create_collection(&self, name: &str, dimension: u64, distance: Distance) -> Result<()>;
    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()>;
    /// Top `limit` hits, most similar first.
    async fn search(&self, collection: &str, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredChunk>>;
}

#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: u64,
    pub distance: Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Existing,
    Created,
}

pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    spec: CollectionSpec,
}

impl VectorStore {
    /// Embeds a sample text to check the model's dimensionality, then makes sure
    /// the collection exists.
    pub async fn connect(
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
        spec: CollectionSpec,
    ) -> Result<Self> {
        let store = Self {
            backend,
            embedder,
            spec,
        };
        let sample = store
            .embed_texts(&["test".to_string()])
            .await
            .context("embedding model check failed")?;
        info!(dimension = sample[0].len(), "embedding model ready");
        store
            .ensure_collection(&store.spec.name, store.spec.dimension, store.spec.distance)
            .await?;
        Ok(store)
    }

    pub fn collection(&self) -> &CollectionSpec {
        &self.spec
    }

    /// Creates `name` with the given schema unless a collection of that name is already listed.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimension: u64,
        distance: Distance,
    ) -> Result<CollectionStatus> {
        let names = self
            .backend
            .collection_names()
            .await
            .context("failed to list collections")?;
        if names.iter().any(|n| n == name) {
            debug!(collection = name, "collection already exists; do not create");
            return Ok(CollectionStatus::Existing);
        }
        info!(collection = name, dimension, ?distance, "collection not found; creating");
        self.backend
            .create_collection(name, dimension, distance)
            .await
            .with_context(|| format!("failed to create collection '{name}'"))?;
        Ok(CollectionStatus::Created)
    }

    /// One vector per input text, in input order. Every vector must match the
    /// collection's dimensionality.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_texts(texts).await?;
        if vectors.len() != texts.len() {
            bail!(
                "embedding model returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }
        if let Some(bad) = vectors
            .iter()
            .find(|v| v.len() as u64 != self.spec.dimension)
        {
            bail!(
                "embedding dimension is {}, collection '{}' expects {}",
                bad.len(),
                self.spec.name,
                self.spec.dimension
            );
        }
        Ok(vectors)
    }

    pub async fn add_texts(&self, texts: &[String]) -> Result<usize> {
        let chunks = texts
            .iter()
            .map(|text| Chunk {
                text: text.clone(),
                source: None,
                page: None,
            })
            .collect();
        self.add_chunks(chunks).await
    }

    /// Embeds and persists `chunks`. Identical text added twice is stored twice.
    pub async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            debug!("no chunks to add");
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_texts(&texts).await?;
        let points: Vec<StoredPoint> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| StoredPoint {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                text: chunk.text,
                source: chunk.source,
                page: chunk.page,
            })
            .collect();
        let count = points.len();
        self.backend
            .upsert(&self.spec.name, points)
            .await
            .with_context(|| format!("failed to upsert into '{}'", self.spec.name))?;
        info!(count, collection = %self.spec.name, "added chunks to the vector store");
        Ok(count)
    }

    pub fn as_retriever(&self, k: u64) -> Retriever<'_> {
        Retriever { store: self, k }
    }
}

/// Similarity search over the store's collection.
pub struct Retriever<'a> {
    store: &'a VectorStore,
    k: u64,
}

impl Retriever<'_> {
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let mut vectors = self.store.embed_texts(&[query.to_string()]).await?;
        let vector = vectors.pop().unwrap_or_default();
        self.store
            .backend
            .search(&self.store.spec.name, vector, self.k)
            .await
            .context("similarity search failed")
    }
}
