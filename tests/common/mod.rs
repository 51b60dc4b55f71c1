//! Fakes shared by the integration tests: a letter-bucket embedder, a model
//! that records its prompts, and a pipeline over the in-memory backend.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use qdrant_client::qdrant::Distance;
use rag_chatbot::embedding::Embedder;
use rag_chatbot::llm::{ChatModel, Completion};
use rag_chatbot::memory::MemoryBackend;
use rag_chatbot::{CollectionSpec, Pipeline, PipelineOptions, VectorStore};

pub const DIM: usize = 8;
pub const COLLECTION: &str = "vector_db";

/// Buckets letters into a small vector; texts sharing letters end up close.
#[derive(Default)]
pub struct LetterEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; DIM];
                for b in t.bytes().filter(u8::is_ascii_alphabetic) {
                    v[(b.to_ascii_lowercase() - b'a') as usize % DIM] += 1.0;
                }
                v[DIM - 1] += 0.01;
                v
            })
            .collect())
    }
}

pub struct RecordingChat {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingChat {
    pub fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn generate(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(Completion {
            result: self.reply.clone(),
        })
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub backend: Arc<MemoryBackend>,
    pub embedder: Arc<LetterEmbedder>,
    pub chat: Arc<RecordingChat>,
}

pub async fn harness(reply: Option<&str>) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let embedder = Arc::new(LetterEmbedder::default());
    let chat = Arc::new(RecordingChat::replying(reply));
    let store = VectorStore::connect(
        backend.clone(),
        embedder.clone(),
        CollectionSpec {
            name: COLLECTION.to_string(),
            dimension: DIM as u64,
            distance: Distance::Cosine,
        },
    )
    .await
    .unwrap();
    let pipeline = Pipeline::new(
        store,
        chat.clone(),
        PipelineOptions {
            top_k: 4,
            chunk_limit: 100,
        },
    );
    Harness {
        pipeline,
        backend,
        embedder,
        chat,
    }
}
