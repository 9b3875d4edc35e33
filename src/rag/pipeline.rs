//! RAG orchestration
//!
//! Entry point for question answering over onboarding documents. The
//! context type picks the policy; the policy drives retrieval, prompt
//! assembly and generation. Empty evidence for SUMMARY, TEMPLATE and
//! DECISION short-circuits with a fixed answer and no generation call.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backends::TemplateCatalog;
use crate::context::{ContextPolicy, ContextStrategy, ContextType, RetrievalMode};
use crate::errors::{AssistError, Result};
use crate::generation::{GenerationGateway, GenerationMode, GenerationResult};
use crate::prefill::SectionPrefillEngine;
use crate::rag::context::{PromptAssembler, PromptContext};
use crate::rag::retrieval::Retriever;
use crate::response::{GuidanceRecord, ResponseParser};
use crate::telemetry::TelemetryEvent;
use crate::types::RuleDescriptor;

/// Answer when a document has no stored artifacts
pub const NO_ARTIFACTS_MESSAGE: &str = "Error: No artifacts found for the given documentId.";

/// Answer when vector search finds nothing for the question
pub const NO_RELEVANT_ARTIFACTS_MESSAGE: &str = "Error: No relevant artifacts found for your question.";

/// Orchestrates retrieval, prompt assembly and generation per context type
#[derive(Clone)]
pub struct RagOrchestrator {
    strategy: ContextStrategy,
    retriever: Retriever,
    assembler: PromptAssembler,
    gateway: GenerationGateway,
    templates: Arc<dyn TemplateCatalog>,
    parser: ResponseParser,
    prefill: SectionPrefillEngine,
}

impl RagOrchestrator {
    /// Create an orchestrator with a default-configured prefill engine
    pub fn new(retriever: Retriever, gateway: GenerationGateway, templates: Arc<dyn TemplateCatalog>) -> Self {
        let prefill = SectionPrefillEngine::new(retriever.clone(), gateway.clone());
        Self::with_prefill_engine(retriever, gateway, templates, prefill)
    }

    pub fn with_prefill_engine(
        retriever: Retriever,
        gateway: GenerationGateway,
        templates: Arc<dyn TemplateCatalog>,
        prefill: SectionPrefillEngine,
    ) -> Self {
        Self {
            strategy: ContextStrategy::new(),
            retriever,
            assembler: PromptAssembler::new(),
            gateway,
            templates,
            parser: ResponseParser::new(),
            prefill,
        }
    }

    /// Answer a question about a document.
    ///
    /// Short-circuit answers come back as `GenerationResult::Complete` even
    /// in stream mode. PREFILL is not a question-answering context; use
    /// [`RagOrchestrator::prefill`].
    pub async fn answer(
        &self,
        question: &str,
        context_type: Option<ContextType>,
        document_id: &str,
        mode: GenerationMode,
    ) -> Result<GenerationResult> {
        let policy = self.strategy.resolve(context_type)?;
        let context = policy.context_type;

        info!(context = context.name(), document_id, ?mode, "answer requested");

        let prompt = match policy.retrieval_mode {
            RetrievalMode::None => self.assembler.assemble_for(&policy, Vec::<String>::new()),
            RetrievalMode::WholeDocument => {
                let chunks = self.retriever.fetch_whole_document(document_id).await?;
                if chunks.is_empty() {
                    return Ok(self.short_circuit(context, NO_ARTIFACTS_MESSAGE));
                }
                self.record_retrieval(context, chunks.len());

                if context == ContextType::Template {
                    self.template_prompt(&policy, question, &chunks).await?
                } else {
                    self.assembler.assemble_for(&policy, &chunks)
                }
            }
            RetrievalMode::VectorSearch => {
                let excerpts = self.retriever.retrieve_default(question, document_id).await?;
                if excerpts.is_empty() {
                    return Ok(self.short_circuit(context, NO_RELEVANT_ARTIFACTS_MESSAGE));
                }
                self.record_retrieval(context, excerpts.len());
                self.assembler
                    .assemble_for(&policy, excerpts.iter().map(|e| e.text.as_str()))
            }
            RetrievalMode::VectorSearchPerField => {
                return Err(AssistError::InvalidInput(format!(
                    "{} requests operate on document sections, use prefill",
                    context.name()
                )));
            }
        };

        debug!(
            context = context.name(),
            excerpts = prompt.excerpt_count(),
            estimated_tokens = prompt.estimated_tokens(),
            "prompt assembled"
        );
        self.gateway.generate(context, question, &prompt, mode).await
    }

    /// Match a document's most relevant excerpts against a rule set.
    ///
    /// No relevant evidence means no matches. Unparseable answers also
    /// mean no matches.
    pub async fn match_rules(
        &self,
        document_id: &str,
        query: &str,
        rules: &[RuleDescriptor],
    ) -> Result<Vec<GuidanceRecord>> {
        let policy = self.strategy.policy_for(ContextType::Template);
        let excerpts = self.retriever.retrieve_default(query, document_id).await?;
        if excerpts.is_empty() {
            self.record_short_circuit(policy.context_type, "no relevant artifacts for rule matching");
            return Ok(Vec::new());
        }
        self.record_retrieval(policy.context_type, excerpts.len());

        let evidence: Vec<String> = excerpts.into_iter().map(|e| e.text).collect();
        let prompt = self.assembler.rule_matching(&policy, rules, &evidence)?;
        let answer = self
            .gateway
            .complete(policy.context_type, query, prompt.as_str())
            .await?;

        let records = self.parser.interpret(policy.response_contract, &answer)?.into_matches();
        debug!(document_id, rules = rules.len(), matched = records.len(), "rule matching completed");
        Ok(records)
    }

    /// Prefill document sections from source document evidence
    pub async fn prefill(
        &self,
        document_sections: Option<&Value>,
        source_document_ids: &[String],
        additional_context: Option<&str>,
    ) -> Result<Value> {
        self.prefill
            .prefill(document_sections, source_document_ids, ContextType::Prefill, additional_context)
            .await
    }

    pub fn gateway(&self) -> &GenerationGateway {
        &self.gateway
    }

    /// Summarize the document, then ask for a classification of that
    /// summary against the catalog's templates
    async fn template_prompt(&self, policy: &ContextPolicy, question: &str, chunks: &[String]) -> Result<PromptContext> {
        let summary_policy = self.strategy.policy_for(ContextType::Summary);
        let summary_prompt = self.assembler.assemble_for(&summary_policy, chunks);
        let summary = self
            .gateway
            .complete(ContextType::Summary, question, summary_prompt.as_str())
            .await?;

        let templates = match self.templates.get_all_templates().await {
            Ok(templates) => templates,
            Err(e) => {
                warn!(error = %e, "template catalog unavailable, classifying against no templates");
                Vec::new()
            }
        };
        if templates.is_empty() {
            debug!("no candidate templates");
        }

        self.assembler.template_classification(policy, &templates, &summary)
    }

    fn short_circuit(&self, context: ContextType, message: &str) -> GenerationResult {
        self.record_short_circuit(context, message);
        GenerationResult::Complete(message.to_string())
    }

    fn record_short_circuit(&self, context: ContextType, reason: &str) {
        info!(context = context.name(), reason, "answered without generation");
        self.gateway.telemetry().record(TelemetryEvent::ShortCircuit {
            context,
            reason: reason.to_string(),
            timestamp: Instant::now(),
        });
    }

    fn record_retrieval(&self, context: ContextType, excerpts: usize) {
        self.gateway.telemetry().record(TelemetryEvent::RetrievalCompleted {
            context,
            excerpts,
            timestamp: Instant::now(),
        });
    }
}
