//! In-memory collaborator implementations
//!
//! Useful for tests and for running the assistant against a small corpus
//! without external services.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::backends::{ArtifactStore, BrdStore, SearchHit, TemplateCatalog, VectorIndexWriter, VectorSearchBackend};
use crate::errors::Result;
use crate::types::{BrdRecord, TemplateDescriptor};

/// Artifact chunks keyed by document id
#[derive(Default)]
pub struct InMemoryArtifactStore {
    chunks: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, document_id: &str, chunks: Vec<String>) {
        self.chunks.write().await.insert(document_id.to_string(), chunks);
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn find_by_document_name(&self, document_id: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks
            .read()
            .await
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Fixed template list
#[derive(Default)]
pub struct InMemoryTemplateCatalog {
    templates: RwLock<Vec<TemplateDescriptor>>,
}

impl InMemoryTemplateCatalog {
    pub fn new(templates: Vec<TemplateDescriptor>) -> Self {
        Self {
            templates: RwLock::new(templates),
        }
    }
}

#[async_trait]
impl TemplateCatalog for InMemoryTemplateCatalog {
    async fn get_all_templates(&self) -> Result<Vec<TemplateDescriptor>> {
        Ok(self.templates.read().await.clone())
    }
}

/// BRD records keyed by id
#[derive(Default)]
pub struct InMemoryBrdStore {
    records: RwLock<HashMap<String, BrdRecord>>,
}

impl InMemoryBrdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: BrdRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }
}

#[async_trait]
impl BrdStore for InMemoryBrdStore {
    async fn find_by_id(&self, brd_id: &str) -> Result<Option<BrdRecord>> {
        Ok(self.records.read().await.get(brd_id).cloned())
    }
}

struct IndexedChunk {
    document_id: String,
    text: String,
    embedding: Vec<f32>,
}

/// Brute-force cosine similarity index over artifact chunks
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, document_id: &str, text: &str, embedding: Vec<f32>) {
        self.entries.write().await.push(IndexedChunk {
            document_id: document_id.to_string(),
            text: text.to_string(),
            embedding,
        });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorSearchBackend for InMemoryVectorIndex {
    async fn search(&self, vector: &[f32], limit: usize, document_id: &str) -> Result<Vec<SearchHit>> {
        let entries = self.entries.read().await;
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .map(|entry| SearchHit {
                text: entry.text.clone(),
                score: cosine_similarity(vector, &entry.embedding),
            })
            .collect();

        // Stable sort keeps insertion order between equal scores
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndexWriter for InMemoryVectorIndex {
    async fn ensure_collection(&self, _dimension: u64) -> Result<()> {
        Ok(())
    }

    async fn upsert_chunks(&self, document_id: &str, chunks: Vec<(String, Vec<f32>)>) -> Result<usize> {
        let count = chunks.len();
        let mut entries = self.entries.write().await;
        entries.extend(chunks.into_iter().map(|(text, embedding)| IndexedChunk {
            document_id: document_id.to_string(),
            text,
            embedding,
        }));
        Ok(count)
    }
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
