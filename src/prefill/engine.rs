//! Section prefill engine
//!
//! For every top-level field of a section tree: search the source document
//! with the field's JSON as the query, ask generation for a filled-in
//! version of the field, and merge the answer into a deep copy. The input
//! tree is never touched, and a single failing field fails the whole call
//! so callers never see a half-merged document.

use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info};

use crate::context::{ContextPolicy, ContextStrategy, ContextType};
use crate::errors::{AssistError, Result};
use crate::generation::GenerationGateway;
use crate::rag::context::PromptAssembler;
use crate::rag::retrieval::Retriever;
use crate::response::ResponseParser;
use crate::telemetry::TelemetryEvent;

/// Default number of excerpts retrieved per field
pub const DEFAULT_VECTOR_SEARCH_LIMIT: usize = 5;

/// Default number of fields evaluated at once
pub const DEFAULT_MAX_CONCURRENT_FIELDS: usize = 4;

/// Candidate replacement for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionUpdate {
    /// Dot-addressed path of the field in the section tree
    pub field_path: String,
    /// Evidence the value was generated from
    pub evidence: Vec<String>,
    pub value: Value,
}

/// Prefills section trees from document evidence
#[derive(Clone)]
pub struct SectionPrefillEngine {
    retriever: Retriever,
    gateway: GenerationGateway,
    assembler: PromptAssembler,
    strategy: ContextStrategy,
    parser: ResponseParser,
    vector_search_limit: usize,
    max_concurrent_fields: usize,
}

impl SectionPrefillEngine {
    pub fn new(retriever: Retriever, gateway: GenerationGateway) -> Self {
        Self {
            retriever,
            gateway,
            assembler: PromptAssembler::new(),
            strategy: ContextStrategy::new(),
            parser: ResponseParser::new(),
            vector_search_limit: DEFAULT_VECTOR_SEARCH_LIMIT,
            max_concurrent_fields: DEFAULT_MAX_CONCURRENT_FIELDS,
        }
    }

    pub fn with_vector_search_limit(mut self, limit: usize) -> Self {
        self.vector_search_limit = limit.max(1);
        self
    }

    pub fn with_max_concurrent_fields(mut self, max: usize) -> Self {
        self.max_concurrent_fields = max.max(1);
        self
    }

    /// Prefill `document_sections` using evidence from the first source document.
    ///
    /// - absent or null sections: an empty object
    /// - non-object sections or no source documents: the input, unchanged
    /// - otherwise: a copy with every field that had matching evidence
    ///   replaced by the generated value
    pub async fn prefill(
        &self,
        document_sections: Option<&Value>,
        source_document_ids: &[String],
        context_type: ContextType,
        additional_context: Option<&str>,
    ) -> Result<Value> {
        let sections = match document_sections {
            None | Some(Value::Null) => return Ok(Value::Object(Map::new())),
            Some(sections) => sections,
        };

        let Value::Object(fields) = sections else {
            debug!("sections are not an object, nothing to prefill");
            return Ok(sections.clone());
        };

        let Some(document_id) = source_document_ids.first() else {
            debug!("no source documents, nothing to prefill");
            return Ok(sections.clone());
        };

        let policy = self.strategy.policy_for(context_type);
        let mut updated = fields.clone();

        info!(
            context = context_type.name(),
            document_id = document_id.as_str(),
            fields = fields.len(),
            "prefill started"
        );

        let updates: Vec<Option<SectionUpdate>> = stream::iter(
            fields
                .iter()
                .map(|(name, node)| self.evaluate_field(&policy, name, node, document_id, additional_context)),
        )
        .buffered(self.max_concurrent_fields)
        .try_collect()
        .await?;

        let telemetry = self.gateway.telemetry();
        let mut applied = 0;
        for update in updates.into_iter().flatten() {
            telemetry.record(TelemetryEvent::PrefillFieldUpdated {
                field: update.field_path.clone(),
                timestamp: Instant::now(),
            });
            updated.insert(update.field_path, update.value);
            applied += 1;
        }

        info!(context = context_type.name(), applied, "prefill completed");
        Ok(Value::Object(updated))
    }

    /// Retrieve evidence for one field and generate its replacement.
    /// `None` when the document has nothing relevant to the field.
    async fn evaluate_field(
        &self,
        policy: &ContextPolicy,
        name: &str,
        node: &Value,
        document_id: &str,
        additional_context: Option<&str>,
    ) -> Result<Option<SectionUpdate>> {
        let query = serde_json::to_string(node)?;
        let excerpts = self
            .retriever
            .retrieve(&query, self.vector_search_limit, document_id)
            .await?;

        if excerpts.is_empty() {
            debug!(field = name, "no matching evidence, field left as is");
            self.gateway.telemetry().record(TelemetryEvent::PrefillFieldSkipped {
                field: name.to_string(),
                timestamp: Instant::now(),
            });
            return Ok(None);
        }

        let evidence: Vec<String> = excerpts.into_iter().map(|e| e.text).collect();
        let prompt = self
            .assembler
            .section_prefill(policy, &query, &evidence, additional_context);

        let answer = self
            .gateway
            .complete(policy.context_type, name, prompt.as_str())
            .await?;

        let value = self
            .parser
            .interpret(policy.response_contract, &answer)
            .map_err(|e| match e {
                AssistError::AiResponseParse(reason) => {
                    AssistError::AiResponseParse(format!("field '{}': {}", name, reason))
                }
                other => other,
            })?
            .into_json();

        debug!(field = name, evidence = evidence.len(), "field prefilled");
        Ok(Some(SectionUpdate {
            field_path: name.to_string(),
            evidence,
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::GenerationBackend;
    use crate::store::memory::{InMemoryArtifactStore, InMemoryVectorIndex};
    use crate::telemetry::TelemetryCollector;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct UnitEmbedder;

    #[async_trait]
    impl crate::backends::EmbeddingBackend for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct FixedAnswer {
        answer: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for FixedAnswer {
        async fn complete(&self, _question: &str, _context: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.to_string())
        }
    }

    async fn engine(answer: &'static str, indexed: &[(&str, &str)]) -> (SectionPrefillEngine, Arc<FixedAnswer>) {
        let index = Arc::new(InMemoryVectorIndex::new());
        for (doc, text) in indexed {
            index.insert(doc, text, vec![1.0, 0.0]).await;
        }
        let retriever = Retriever::new(Arc::new(UnitEmbedder), index, Arc::new(InMemoryArtifactStore::new()));
        let backend = Arc::new(FixedAnswer {
            answer,
            calls: AtomicUsize::new(0),
        });
        let gateway = GenerationGateway::new(backend.clone(), TelemetryCollector::new());
        (SectionPrefillEngine::new(retriever, gateway), backend)
    }

    #[tokio::test]
    async fn test_null_sections_give_empty_object() {
        let (engine, backend) = engine("{}", &[]).await;
        let ids = vec!["doc".to_string()];

        let out = engine.prefill(None, &ids, ContextType::Prefill, None).await.unwrap();
        assert_eq!(out, json!({}));
        let out = engine
            .prefill(Some(&Value::Null), &ids, ContextType::Prefill, None)
            .await
            .unwrap();
        assert_eq!(out, json!({}));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_object_and_empty_ids_unchanged() {
        let (engine, backend) = engine("{}", &[("doc", "text")]).await;

        let list = json!(["a", "b"]);
        let out = engine
            .prefill(Some(&list), &["doc".to_string()], ContextType::Prefill, None)
            .await
            .unwrap();
        assert_eq!(out, list);

        let sections = json!({"section1": {}});
        let out = engine
            .prefill(Some(&sections), &[], ContextType::Prefill, None)
            .await
            .unwrap();
        assert_eq!(out, sections);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_matching_field_is_replaced() {
        let (engine, _) = engine(r#"{"owner": "Finance"}"#, &[("doc", "Matching content")]).await;
        let sections = json!({"section1": {}, "section2": {"keep": true}});

        let out = engine
            .prefill(Some(&sections), &["doc".to_string()], ContextType::Prefill, None)
            .await
            .unwrap();

        assert_eq!(out["section1"], json!({"owner": "Finance"}));
        assert_eq!(out["section2"], json!({"owner": "Finance"}));
        assert_eq!(sections, json!({"section1": {}, "section2": {"keep": true}}));
    }

    #[tokio::test]
    async fn test_no_evidence_leaves_document_unchanged() {
        let (engine, backend) = engine(r#"{"x": 1}"#, &[("other-doc", "text")]).await;
        let sections = json!({"section1": {"a": 1}});

        let out = engine
            .prefill(Some(&sections), &["doc".to_string()], ContextType::Prefill, None)
            .await
            .unwrap();

        assert_eq!(out, sections);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.gateway.telemetry().get_stats().fields_skipped, 1);
    }

    #[tokio::test]
    async fn test_invalid_answer_fails_whole_prefill() {
        let (engine, _) = engine("not json", &[("doc", "Matching content")]).await;
        let sections = json!({"section1": {}});

        let result = engine
            .prefill(Some(&sections), &["doc".to_string()], ContextType::Prefill, None)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AssistError::AiResponseParse(_)));
        assert!(err.to_string().starts_with("Error parsing AI response JSON"));
    }

    #[tokio::test]
    async fn test_only_first_source_document_is_searched() {
        let (engine, backend) = engine(r#"{"v": 2}"#, &[("second", "Matching content")]).await;
        let sections = json!({"section1": {}});
        let ids = vec!["first".to_string(), "second".to_string()];

        let out = engine
            .prefill(Some(&sections), &ids, ContextType::Prefill, None)
            .await
            .unwrap();

        assert_eq!(out, sections);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fenced_answer_accepted() {
        let (engine, _) = engine("```json\n{\"v\": 3}\n```", &[("doc", "Matching content")]).await;
        let sections = json!({"section1": {}});

        let out = engine
            .prefill(Some(&sections), &["doc".to_string()], ContextType::Prefill, None)
            .await
            .unwrap();
        assert_eq!(out, json!({"section1": {"v": 3}}));
    }
}
