//! Retriever for document artifacts
//!
//! Wraps embedding generation, bounded vector search and whole-document
//! fetches. Backend failures are returned untouched; deciding whether an
//! empty result is an error belongs to the calling strategy.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::backends::{ArtifactStore, EmbeddingBackend, VectorSearchBackend};
use crate::errors::Result;
use crate::types::RetrievedExcerpt;

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of results requested when the caller does not say
    pub top_k: usize,
    /// Hard ceiling on any request
    pub max_top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 50,
        }
    }
}

impl SearchParams {
    /// Clamp a requested result count into `1..=max_top_k`
    pub fn bound(&self, k: usize) -> usize {
        k.clamp(1, self.max_top_k.max(1))
    }
}

/// Retriever over artifact chunks
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingBackend>,
    vector_search: Arc<dyn VectorSearchBackend>,
    artifacts: Arc<dyn ArtifactStore>,
    default_params: SearchParams,
}

impl Retriever {
    /// Create new retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        vector_search: Arc<dyn VectorSearchBackend>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self::with_params(embedder, vector_search, artifacts, SearchParams::default())
    }

    /// Create with custom default parameters
    pub fn with_params(
        embedder: Arc<dyn EmbeddingBackend>,
        vector_search: Arc<dyn VectorSearchBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            vector_search,
            artifacts,
            default_params: params,
        }
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Embed several texts in one backend round-trip where supported
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedder.embed_batch(texts).await
    }

    /// Top-K vector search scoped to one document.
    ///
    /// `k` is clamped to the configured ceiling and the backend's answer is
    /// truncated to it, so callers never see more than `k` excerpts.
    pub async fn search_top_k(
        &self,
        vector: &[f32],
        k: usize,
        document_id: &str,
    ) -> Result<Vec<RetrievedExcerpt>> {
        let limit = self.default_params.bound(k);
        let hits = self.vector_search.search(vector, limit, document_id).await?;

        let excerpts: Vec<RetrievedExcerpt> = hits
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(rank, hit)| RetrievedExcerpt::new(hit.text, rank))
            .collect();

        debug!(document_id, limit, found = excerpts.len(), "vector search completed");
        Ok(excerpts)
    }

    /// Embed the query and run a bounded search
    pub async fn retrieve(&self, query: &str, k: usize, document_id: &str) -> Result<Vec<RetrievedExcerpt>> {
        let vector = self.embed(query).await?;
        self.search_top_k(&vector, k, document_id).await
    }

    /// Retrieve with the default result count
    pub async fn retrieve_default(&self, query: &str, document_id: &str) -> Result<Vec<RetrievedExcerpt>> {
        self.retrieve(query, self.default_params.top_k, document_id).await
    }

    /// All artifact chunks of a document, unranked, in stored order
    pub async fn fetch_whole_document(&self, document_id: &str) -> Result<Vec<String>> {
        let chunks = self.artifacts.find_by_document_name(document_id).await?;
        debug!(document_id, chunks = chunks.len(), "whole document fetched");
        Ok(chunks)
    }

    /// Get default search parameters
    pub fn default_params(&self) -> &SearchParams {
        &self.default_params
    }

    /// Update default search parameters
    pub fn set_default_params(&mut self, params: SearchParams) {
        self.default_params = params;
    }
}
