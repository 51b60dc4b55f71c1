use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

/// What came back from the language model. `result` is `None` when the
/// response carried no usable text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub result: Option<String>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Completion>;
}

#[derive(Debug, Clone)]
pub struct OllamaChat {
    inner: Ollama,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OllamaChat {
    pub fn new(url: &str, model: impl Into<String>, temperature: f32, timeout: Duration) -> Result<Self> {
        let inner = Ollama::try_new(url).with_context(|| format!("invalid Ollama URL: {url}"))?;
        Ok(Self {
            inner,
            model: model.into(),
            temperature,
            timeout,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn generate(&self, prompt: &str) -> Result<Completion> {
        let req = GenerationRequest::new(self.model.clone(), prompt.to_string())
            .options(ModelOptions::default().temperature(self.temperature));
        let res = tokio::time::timeout(self.timeout, self.inner.generate(req))
            .await
            .with_context(|| format!("generation timed out after {:?}", self.timeout))?
            .with_context(|| format!("generation with model '{}' failed", self.model))?;
        let text = res.response.trim();
        Ok(Completion {
            result: (!text.is_empty()).then(|| text.to_string()),
        })
    }
}
