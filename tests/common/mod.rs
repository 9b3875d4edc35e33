//! Shared test doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use brdbuddy::backends::{
    EmbeddingBackend, GenerationBackend, SearchHit, TemplateCatalog, VectorSearchBackend,
};
use brdbuddy::generation::GenerationGateway;
use brdbuddy::rag::{RagOrchestrator, Retriever};
use brdbuddy::store::{InMemoryArtifactStore, InMemoryTemplateCatalog, InMemoryVectorIndex};
use brdbuddy::telemetry::TelemetryCollector;
use brdbuddy::types::TemplateDescriptor;
use brdbuddy::{AssistError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Generation call as seen by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub question: String,
    pub context: String,
}

/// Returns the context it was given
#[derive(Default)]
pub struct EchoBackend {
    calls: Mutex<Vec<Call>>,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn complete(&self, question: &str, context: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            question: question.to_string(),
            context: context.to_string(),
        });
        Ok(context.to_string())
    }
}

/// Replays queued results in order, failing once the script runs out
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, _question: &str, _context: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistError::Generation("script exhausted".into())))
    }
}

/// Answers by question (the prefill engine asks per field name)
pub struct PerQuestionBackend {
    answers: HashMap<String, String>,
    calls: Mutex<Vec<Call>>,
}

impl PerQuestionBackend {
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(q, a)| (q.to_string(), a.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for PerQuestionBackend {
    async fn complete(&self, question: &str, context: &str) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            question: question.to_string(),
            context: context.to_string(),
        });
        self.answers
            .get(question)
            .cloned()
            .ok_or_else(|| AssistError::Generation(format!("unexpected question: {}", question)))
    }
}

/// Embeds known texts to fixed vectors, everything else to `fallback`
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl TableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
        Self {
            table: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            fallback,
        }
    }

    /// Every text maps to the same unit vector
    pub fn uniform() -> Self {
        Self::new(&[], vec![1.0, 0.0])
    }
}

#[async_trait]
impl EmbeddingBackend for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.table.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Drops hits below a similarity threshold
pub struct ThresholdIndex {
    pub inner: Arc<InMemoryVectorIndex>,
    pub min_score: f32,
}

#[async_trait]
impl VectorSearchBackend for ThresholdIndex {
    async fn search(&self, vector: &[f32], limit: usize, document_id: &str) -> Result<Vec<SearchHit>> {
        let hits = self.inner.search(vector, limit, document_id).await?;
        Ok(hits.into_iter().filter(|h| h.score >= self.min_score).collect())
    }
}

/// Embedding backend that is always down
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingBackend for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AssistError::Embedding("down".into()))
    }
}

/// Vector search backend that is always down
pub struct FailingSearch;

#[async_trait]
impl VectorSearchBackend for FailingSearch {
    async fn search(&self, _vector: &[f32], _limit: usize, _document_id: &str) -> Result<Vec<SearchHit>> {
        Err(AssistError::VectorSearch("index unavailable".into()))
    }
}

/// Catalog that is always down
pub struct FailingCatalog;

#[async_trait]
impl TemplateCatalog for FailingCatalog {
    async fn get_all_templates(&self) -> Result<Vec<TemplateDescriptor>> {
        Err(AssistError::TemplateCatalog("catalog offline".into()))
    }
}

pub const DOC: &str = "doc-1";

/// Document `doc-1` with two stored chunks and one indexed passage
pub async fn seeded_stores() -> (Arc<InMemoryArtifactStore>, Arc<InMemoryVectorIndex>) {
    let artifacts = Arc::new(InMemoryArtifactStore::new());
    artifacts
        .insert(
            DOC,
            vec![
                "Merchant onboarding covers three EU regions.".to_string(),
                "Settlement runs daily at 18:00 CET.".to_string(),
            ],
        )
        .await;

    let index = Arc::new(InMemoryVectorIndex::new());
    index
        .insert(DOC, "Settlement runs daily at 18:00 CET.", vec![1.0, 0.0])
        .await;
    index
        .insert(DOC, "Chargebacks are handled by the risk team.", vec![0.8, 0.6])
        .await;

    (artifacts, index)
}

pub fn templates() -> Vec<TemplateDescriptor> {
    vec![
        TemplateDescriptor {
            name: "Card acquiring".into(),
            description: "Merchant card acceptance".into(),
            category: Some("payments".into()),
        },
        TemplateDescriptor {
            name: "Payouts".into(),
            description: "Outbound disbursements".into(),
            category: None,
        },
    ]
}

/// Orchestrator over the seeded stores with the given backend and catalog
pub async fn orchestrator_with(
    backend: Arc<dyn GenerationBackend>,
    catalog: Arc<dyn TemplateCatalog>,
) -> (RagOrchestrator, TelemetryCollector) {
    let (artifacts, index) = seeded_stores().await;
    let retriever = Retriever::new(Arc::new(TableEmbedder::uniform()), index, artifacts);
    let telemetry = TelemetryCollector::new();
    let gateway = GenerationGateway::new(backend, telemetry.clone());
    (RagOrchestrator::new(retriever, gateway, catalog), telemetry)
}

/// Orchestrator over the seeded artifacts with custom retrieval backends
pub async fn orchestrator_over(
    embedder: Arc<dyn EmbeddingBackend>,
    search: Arc<dyn VectorSearchBackend>,
    backend: Arc<dyn GenerationBackend>,
) -> (RagOrchestrator, TelemetryCollector) {
    let (artifacts, _) = seeded_stores().await;
    let retriever = Retriever::new(embedder, search, artifacts);
    let telemetry = TelemetryCollector::new();
    let gateway = GenerationGateway::new(backend, telemetry.clone());
    let catalog = Arc::new(InMemoryTemplateCatalog::new(templates()));
    (RagOrchestrator::new(retriever, gateway, catalog), telemetry)
}

pub async fn echo_orchestrator() -> (RagOrchestrator, Arc<EchoBackend>, TelemetryCollector) {
    let echo = Arc::new(EchoBackend::new());
    let (orchestrator, telemetry) =
        orchestrator_with(echo.clone(), Arc::new(InMemoryTemplateCatalog::new(templates()))).await;
    (orchestrator, echo, telemetry)
}
