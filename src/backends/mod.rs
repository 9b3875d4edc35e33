//! Collaborator contracts
//!
//! The orchestration core never talks to a model, index or database
//! directly. Everything it consumes sits behind one of these traits so the
//! Ollama/Qdrant implementations, the file stores and test doubles are
//! interchangeable.

use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use std::pin::Pin;

use crate::errors::Result;
use crate::types::{BrdRecord, TemplateDescriptor};

/// Ordered, finite sequence of generated text chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Vector search hit as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// Produces embedding vectors for text
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; order of the output matches the input
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Nearest-neighbour search over artifact chunks of one document
#[async_trait]
pub trait VectorSearchBackend: Send + Sync {
    /// May return fewer than `limit` hits, including none
    async fn search(&self, vector: &[f32], limit: usize, document_id: &str) -> Result<Vec<SearchHit>>;
}

/// Write side of the vector index, used when artifacts are (re)indexed
#[async_trait]
pub trait VectorIndexWriter: Send + Sync {
    /// Prepare storage for vectors of `dimension`; a no-op when it exists
    async fn ensure_collection(&self, dimension: u64) -> Result<()>;

    /// Store embedded chunks of one document, returning how many were written
    async fn upsert_chunks(&self, document_id: &str, chunks: Vec<(String, Vec<f32>)>) -> Result<usize>;
}

/// Text generation backend.
///
/// Implementations must report prompt overflow as
/// [`AssistError::TokenLimitExceeded`](crate::errors::AssistError::TokenLimitExceeded)
/// so the gateway can tell it apart from other failures.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, question: &str, context: &str) -> Result<String>;

    /// Stream the answer in chunks; the default emits the batch answer as one chunk
    async fn complete_stream(&self, question: &str, context: &str) -> Result<ChunkStream> {
        let answer = self.complete(question, context).await?;
        Ok(Box::pin(stream::iter(vec![Ok(answer)])))
    }
}

/// Blocking generation client that must not run on the async executor
pub trait LegacyGenerationBackend: Send + Sync + 'static {
    fn complete(&self, question: &str, context: &str) -> Result<String>;
}

/// Extracted text chunks by source document
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn find_by_document_name(&self, document_id: &str) -> Result<Vec<String>>;
}

/// Catalog of template definitions used for classification
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn get_all_templates(&self) -> Result<Vec<TemplateDescriptor>>;
}

/// Read-only BRD lookup
#[async_trait]
pub trait BrdStore: Send + Sync {
    async fn find_by_id(&self, brd_id: &str) -> Result<Option<BrdRecord>>;
}
