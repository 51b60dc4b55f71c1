use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;

/// Batch text-to-vector model. Output is order-preserving: `output[i]` embeds `texts[i]`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embeddings served by an Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    inner: Ollama,
    model: String,
    timeout: Duration,
}

impl OllamaEmbedder {
    pub fn new(url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let inner = Ollama::try_new(url).with_context(|| format!("invalid Ollama URL: {url}"))?;
        Ok(Self {
            inner,
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );
        let res = tokio::time::timeout(self.timeout, self.inner.generate_embeddings(req))
            .await
            .with_context(|| format!("embedding request timed out after {:?}", self.timeout))?
            .with_context(|| format!("embedding request to model '{}' failed", self.model))?;
        Ok(res.embeddings)
    }
}
