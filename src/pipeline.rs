//! Ingestion and query pipeline: load → split → cap → persist, and
//! retrieve → prompt → generate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use qdrant_client::qdrant::Distance;
use tracing::{info, warn};

use crate::config::Settings;
use crate::embedding::OllamaEmbedder;
use crate::llm::{ChatModel, OllamaChat};
use crate::loader::{self, FileFailure};
use crate::memory::MemoryBackend;
use crate::prompt::format_prompt;
use crate::qdrant_util;
use crate::splitter;
use crate::store::{CollectionSpec, VectorBackend, VectorStore};

pub const SESSION_CLOSED: &str = "Session closed.";
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate a valid response.";

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub top_k: u64,
    /// Chunks beyond this many are dropped before anything is embedded.
    pub chunk_limit: usize,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks_produced: usize,
    pub chunks_stored: usize,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

pub struct Pipeline {
    store: VectorStore,
    chat: Arc<dyn ChatModel>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(store: VectorStore, chat: Arc<dyn ChatModel>, options: PipelineOptions) -> Self {
        Self {
            store,
            chat,
            options,
        }
    }

    /// Wires Ollama and Qdrant (or the in-process backend) from `settings`.
    pub async fn connect(settings: &Settings, in_memory: bool) -> Result<Self> {
        let backend: Arc<dyn VectorBackend> = if in_memory {
            info!("using in-memory vector store");
            Arc::new(MemoryBackend::new())
        } else {
            info!(url = %settings.qdrant_url, "connecting to Qdrant");
            Arc::new(qdrant_util::connect(&settings.qdrant_url, settings.request_timeout)?)
        };
        info!(model = %settings.embed_model, "initializing Ollama embeddings");
        let embedder = Arc::new(OllamaEmbedder::new(
            &settings.ollama_url,
            settings.embed_model.clone(),
            settings.request_timeout,
        )?);
        let chat = Arc::new(OllamaChat::new(
            &settings.ollama_url,
            settings.llm_model.clone(),
            settings.llm_temperature,
            settings.request_timeout,
        )?);
        let store = VectorStore::connect(
            backend,
            embedder,
            CollectionSpec {
                name: settings.collection_name.clone(),
                dimension: settings.vector_size,
                distance: Distance::Cosine,
            },
        )
        .await?;
        Ok(Self::new(
            store,
            chat,
            PipelineOptions {
                top_k: settings.top_k,
                chunk_limit: settings.ingest_chunk_limit,
            },
        ))
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let owned = path.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || loader::load_documents(&owned))
            .await
            .context("document loader panicked")?
            .with_context(|| format!("failed to load documents from {}", path.display()))?;

        let mut chunks = splitter::split_documents(&loaded.documents)?;
        let chunks_produced = chunks.len();
        if chunks_produced > self.options.chunk_limit {
            warn!(
                produced = chunks_produced,
                limit = self.options.chunk_limit,
                "chunk limit reached; dropping the remainder"
            );
            chunks.truncate(self.options.chunk_limit);
        }
        info!(count = chunks.len(), "adding text chunks to the vector store");
        let chunks_stored = self.store.add_chunks(chunks).await?;

        Ok(IngestReport {
            documents: loaded.documents.len(),
            chunks_produced,
            chunks_stored,
            skipped: loaded.skipped,
            failures: loaded.failures,
        })
    }

    /// One retrieve-then-generate pass. `exit` (any case) short-circuits without retrieval.
    pub async fn answer(&self, query: &str) -> Result<String> {
        if query.trim().eq_ignore_ascii_case("exit") {
            info!("exiting session");
            return Ok(SESSION_CLOSED.to_string());
        }
        let hits = self
            .store
            .as_retriever(self.options.top_k)
            .retrieve(query)
            .await?;
        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format_prompt(&context, query);
        let completion = self.chat.generate(&prompt).await?;
        Ok(completion
            .result
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string()))
    }
}
