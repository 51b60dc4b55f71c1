use anyhow::Result;
use text_splitter::{ChunkConfig, TextSplitter};

use crate::llama3::{CHUNK_OVERLAP, CHUNK_SIZE};
use crate::loader::Document;

/// A bounded-length piece of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source: Option<String>,
    pub page: Option<u32>,
}

/// Splits on paragraph, then sentence, then word boundaries before cutting
/// inside a word. Chunks keep their document's order and metadata.
///
/// Consecutive chunks share up to `CHUNK_OVERLAP` characters. The overlap is
/// also cut on a boundary, so it is often shorter than the limit.
pub fn split_documents(documents: &[Document]) -> Result<Vec<Chunk>> {
    split_documents_with(documents, CHUNK_SIZE, CHUNK_OVERLAP)
}

pub fn split_documents_with(
    documents: &[Document],
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let splitter = TextSplitter::new(ChunkConfig::new(max_chars).with_overlap(overlap)?);
    Ok(documents
        .iter()
        .flat_map(|doc| {
            splitter.chunks(&doc.text).map(move |text| Chunk {
                text: text.to_string(),
                source: doc.metadata.source.clone(),
                page: doc.metadata.page,
            })
        })
        .collect())
}
