//! Runtime settings, read from the environment (optionally seeded by a `.env` file).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llama3;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_UPLOAD_DIR: &str = "temp_files";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Settings {
    pub qdrant_url: String,
    pub ollama_url: String,
    pub embed_model: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub collection_name: String,
    pub vector_size: u64,
    pub top_k: u64,
    /// Maximum number of chunks persisted per `ingest` call.
    pub ingest_chunk_limit: usize,
    pub request_timeout: Duration,
    pub bind_addr: String,
    pub upload_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embed_model: llama3::EMBED_MODEL.to_string(),
            llm_model: llama3::LLM_MODEL.to_string(),
            llm_temperature: llama3::LLM_TEMPERATURE,
            collection_name: llama3::COLLECTION_NAME.to_string(),
            vector_size: llama3::VECTOR_SIZE,
            top_k: llama3::TOP_K,
            ingest_chunk_limit: llama3::INGEST_CHUNK_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).filter(|v| !v.is_empty()).unwrap_or(default);

        Ok(Self {
            qdrant_url: string("QDRANT_URL", defaults.qdrant_url),
            ollama_url: string("OLLAMA_URL", defaults.ollama_url),
            embed_model: string("EMBED_MODEL", defaults.embed_model),
            llm_model: string("LLM_MODEL", defaults.llm_model),
            llm_temperature: parse(&lookup, "LLM_TEMPERATURE", defaults.llm_temperature)?,
            collection_name: string("COLLECTION_NAME", defaults.collection_name),
            vector_size: parse(&lookup, "VECTOR_SIZE", defaults.vector_size)?,
            top_k: parse(&lookup, "TOP_K", defaults.top_k)?,
            ingest_chunk_limit: parse(&lookup, "INGEST_CHUNK_LIMIT", defaults.ingest_chunk_limit)?,
            request_timeout: Duration::from_secs(parse(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            bind_addr: string("BIND_ADDR", defaults.bind_addr),
            upload_dir: lookup("UPLOAD_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
