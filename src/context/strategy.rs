//! Context strategy resolution
//!
//! Pure mapping from a context type to the policy that serves it. No I/O
//! happens here; the orchestrator reads the policy and drives retrieval,
//! prompt assembly and parsing accordingly.

use serde::{Deserialize, Serialize};

use crate::context::types::ContextType;
use crate::errors::{AssistError, Result};

/// Excerpt separator for whole-document contexts
pub const LINE_SEPARATOR: &str = "\n";

/// Excerpt separator for ranked-evidence contexts
pub const BLANK_LINE_SEPARATOR: &str = "\n\n";

/// How evidence is gathered for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalMode {
    /// No retrieval; the instruction prompt is the whole context
    None,
    /// Every artifact chunk of the document, in stored order
    WholeDocument,
    /// Top-K vector search with the question as query
    VectorSearch,
    /// Top-K vector search once per document field
    VectorSearchPerField,
}

/// Shape the generation answer is expected to take; selects how
/// [`ResponseParser::interpret`](crate::response::ResponseParser::interpret)
/// reads it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseContract {
    /// Returned to the caller as-is
    FreeText,
    /// JSON list of matches, parsed leniently
    MatchList,
    /// JSON node that must parse, or the request fails
    StrictJson,
}

/// Policy resolved for a single context type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    pub context_type: ContextType,
    pub retrieval_mode: RetrievalMode,
    pub default_prompt: &'static str,
    pub response_contract: ResponseContract,
    /// Joins excerpts during prompt assembly
    pub separator: &'static str,
}

/// Resolves context types into policies
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextStrategy;

impl ContextStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a possibly-missing context type.
    ///
    /// A missing context type is a contract violation, not a recoverable
    /// condition.
    pub fn resolve(&self, context_type: Option<ContextType>) -> Result<ContextPolicy> {
        context_type
            .map(|ct| self.policy_for(ct))
            .ok_or_else(|| AssistError::InvalidInput("context type must not be null".to_string()))
    }

    /// Policy for a known context type
    pub fn policy_for(&self, context_type: ContextType) -> ContextPolicy {
        let (retrieval_mode, response_contract, separator) = match context_type {
            ContextType::Chat => (RetrievalMode::None, ResponseContract::FreeText, BLANK_LINE_SEPARATOR),
            ContextType::Summary => (
                RetrievalMode::WholeDocument,
                ResponseContract::FreeText,
                LINE_SEPARATOR,
            ),
            ContextType::Template => (
                RetrievalMode::WholeDocument,
                ResponseContract::MatchList,
                LINE_SEPARATOR,
            ),
            ContextType::Decision => (
                RetrievalMode::VectorSearch,
                ResponseContract::FreeText,
                BLANK_LINE_SEPARATOR,
            ),
            ContextType::Prefill => (
                RetrievalMode::VectorSearchPerField,
                ResponseContract::StrictJson,
                BLANK_LINE_SEPARATOR,
            ),
        };

        ContextPolicy {
            context_type,
            retrieval_mode,
            default_prompt: context_type.default_prompt(),
            response_contract,
            separator,
        }
    }
}
