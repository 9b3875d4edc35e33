//! Qdrant vector store for artifact chunks
//!
//! Each point carries the chunk text and the owning document id in its
//! payload. Searches are always scoped to one document with a keyword
//! filter on `document_id`.

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        condition::ConditionOneOf, r#match::MatchValue, value::Kind, vectors_config::Config,
        with_payload_selector::SelectorOptions, Condition, CreateCollection, Distance, FieldCondition,
        Filter, Match, PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backends::{SearchHit, VectorIndexWriter, VectorSearchBackend};
use crate::errors::{AssistError, Result};

/// Default Qdrant gRPC endpoint
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default collection holding artifact chunks
pub const DEFAULT_COLLECTION: &str = "artifacts";

const TEXT_KEY: &str = "text";
const DOCUMENT_KEY: &str = "document_id";

/// Vector search backend over a Qdrant collection
pub struct QdrantVectorStore {
    client: QdrantClient,
    collection: String,
}

impl QdrantVectorStore {
    /// Connect to Qdrant. No request is made until first use.
    pub fn connect(url: &str, collection: &str) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| AssistError::VectorSearch(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorIndexWriter for QdrantVectorStore {
    /// Create the collection (cosine distance) if it does not exist yet
    async fn ensure_collection(&self, dimension: u64) -> Result<()> {
        let existing = self
            .client
            .list_collections()
            .await
            .map_err(|e| AssistError::VectorSearch(format!("Failed to list collections: {}", e)))?;

        if existing.collections.iter().any(|c| c.name == self.collection) {
            return Ok(());
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: dimension,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| AssistError::VectorSearch(format!("Failed to create collection {}: {}", self.collection, e)))?;

        info!(collection = self.collection.as_str(), dimension, "collection created");
        Ok(())
    }

    /// Index embedded chunks of one document
    async fn upsert_chunks(&self, document_id: &str, chunks: Vec<(String, Vec<f32>)>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|(text, embedding)| {
                PointStruct::new(Uuid::new_v4().to_string(), embedding, chunk_payload(document_id, text))
            })
            .collect();
        let count = points.len();

        self.client
            .upsert_points_blocking(self.collection.as_str(), None, points, None)
            .await
            .map_err(|e| AssistError::VectorSearch(format!("Failed to upsert points: {}", e)))?;

        debug!(document_id, count, "chunks indexed");
        Ok(count)
    }
}

#[async_trait]
impl VectorSearchBackend for QdrantVectorStore {
    async fn search(&self, vector: &[f32], limit: usize, document_id: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: limit as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                filter: Some(document_filter(document_id)),
                ..Default::default()
            })
            .await
            .map_err(|e| AssistError::VectorSearch(format!("Failed to search points: {}", e)))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                payload_text(&point.payload).map(|text| SearchHit {
                    text,
                    score: point.score,
                })
            })
            .collect())
    }
}

/// Keyword filter restricting a search to one document
fn document_filter(document_id: &str) -> Filter {
    Filter {
        must: vec![Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: DOCUMENT_KEY.to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Keyword(document_id.to_string())),
                }),
                ..Default::default()
            })),
        }],
        ..Default::default()
    }
}

fn chunk_payload(document_id: &str, text: String) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    payload.insert(TEXT_KEY.to_string(), QdrantValue::from(text));
    payload.insert(DOCUMENT_KEY.to_string(), QdrantValue::from(document_id.to_string()));
    payload
}

fn payload_text(payload: &HashMap<String, QdrantValue>) -> Option<String> {
    match payload.get(TEXT_KEY)?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}
