//! Artifact indexing
//!
//! Makes a document searchable: its stored chunks are embedded in one batch
//! and written to the vector index under the document's id. DECISION
//! questions and prefill only find what has been indexed here.

use std::sync::Arc;
use tracing::info;

use crate::backends::VectorIndexWriter;
use crate::errors::{AssistError, Result};
use crate::rag::retrieval::Retriever;

/// Embeds a document's artifact chunks and writes them to the vector index
#[derive(Clone)]
pub struct ArtifactIndexer {
    retriever: Retriever,
    writer: Arc<dyn VectorIndexWriter>,
}

impl ArtifactIndexer {
    pub fn new(retriever: Retriever, writer: Arc<dyn VectorIndexWriter>) -> Self {
        Self { retriever, writer }
    }

    /// Index every stored chunk of `document_id`; returns the number written.
    ///
    /// A document without artifacts is `NotFound`; nothing is written.
    pub async fn index_document(&self, document_id: &str) -> Result<usize> {
        let chunks = self.retriever.fetch_whole_document(document_id).await?;
        if chunks.is_empty() {
            return Err(AssistError::not_found("Artifacts for document", document_id));
        }

        let vectors = self.retriever.embed_batch(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(AssistError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        if dimension == 0 {
            return Err(AssistError::Embedding("Embedding backend returned empty vectors".to_string()));
        }

        self.writer.ensure_collection(dimension as u64).await?;
        let written = self
            .writer
            .upsert_chunks(document_id, chunks.into_iter().zip(vectors).collect())
            .await?;

        info!(document_id, chunks = written, dimension, "document indexed");
        Ok(written)
    }
}
