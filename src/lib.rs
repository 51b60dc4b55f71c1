//! Retrieval-augmented chat over local documents: PDF, DOCX, CSV and
//! spreadsheets are chunked, embedded with Ollama, stored in Qdrant and used as
//! context for a language model.

pub mod config;
pub mod embedding;
pub mod llama3;
pub mod llm;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod qdrant_util;
pub mod server;
pub mod splitter;
pub mod store;

pub use config::Settings;
pub use loader::{load_documents, Document, LoadError, LoadReport, LoaderKind};
pub use pipeline::{IngestReport, Pipeline, PipelineOptions};
pub use splitter::{split_documents, Chunk};
pub use store::{CollectionSpec, CollectionStatus, Retriever, VectorStore};
