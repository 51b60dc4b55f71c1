pub const COLLECTION_NAME: &str = "vector_db";
pub const VECTOR_SIZE: u64 = 4096; // llama3 embedding size: 4096 dimensions
pub const EMBED_MODEL: &str = "llama3:latest";
pub const LLM_MODEL: &str = "llama3";
pub const LLM_TEMPERATURE: f32 = 0.7;
pub const CHUNK_SIZE: usize = 1500; // characters
pub const CHUNK_OVERLAP: usize = 100; // characters
pub const INGEST_CHUNK_LIMIT: usize = 100;
pub const TOP_K: u64 = 4;
