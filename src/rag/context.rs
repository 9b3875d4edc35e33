//! Prompt assembly for RAG requests
//!
//! Layout is fixed: the instruction, a blank line, then the excerpts joined
//! by the context type's separator. With no excerpts the instruction stands
//! alone. Nothing is trimmed here; the retriever's top-K is the only bound.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::ContextPolicy;
use crate::errors::Result;
use crate::types::{RuleDescriptor, TemplateDescriptor};

/// Separates the instruction from the evidence block
const INSTRUCTION_BREAK: &str = "\n\n";

/// Fully assembled instruction + evidence passed to generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    text: String,
    excerpt_count: usize,
}

impl PromptContext {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Number of excerpts included
    pub fn excerpt_count(&self) -> usize {
        self.excerpt_count
    }

    /// Rough token estimate (~4 chars per token)
    pub fn estimated_tokens(&self) -> usize {
        self.text.len() / 4
    }
}

impl fmt::Display for PromptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Builds prompt contexts from instructions and excerpts
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptAssembler;

impl PromptAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Join an instruction and excerpts with an explicit separator
    pub fn assemble<I, S>(&self, instruction: &str, excerpts: I, separator: &str) -> PromptContext
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<S> = excerpts.into_iter().collect();
        let excerpt_count = parts.len();

        let text = if parts.is_empty() {
            instruction.to_string()
        } else {
            let joined = parts
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<&str>>()
                .join(separator);
            format!("{}{}{}", instruction, INSTRUCTION_BREAK, joined)
        };

        PromptContext { text, excerpt_count }
    }

    /// Assemble with the policy's default prompt and separator
    pub fn assemble_for<I, S>(&self, policy: &ContextPolicy, excerpts: I) -> PromptContext
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assemble(policy.default_prompt, excerpts, policy.separator)
    }

    /// Classification prompt: candidate templates in the instruction, summary as evidence
    pub fn template_classification(
        &self,
        policy: &ContextPolicy,
        templates: &[TemplateDescriptor],
        summary: &str,
    ) -> Result<PromptContext> {
        let candidates = serde_json::to_string_pretty(templates)?;
        let instruction = format!("{}\n\nCandidate templates:\n{}", policy.default_prompt, candidates);
        Ok(self.assemble(&instruction, [summary], policy.separator))
    }

    /// Rule matching prompt: rules in the instruction, retrieved evidence as excerpts
    pub fn rule_matching(
        &self,
        policy: &ContextPolicy,
        rules: &[RuleDescriptor],
        evidence: &[String],
    ) -> Result<PromptContext> {
        let listed = serde_json::to_string_pretty(rules)?;
        let instruction = format!("{}\n\nRules:\n{}", policy.default_prompt, listed);
        Ok(self.assemble(&instruction, evidence, policy.separator))
    }

    /// Prefill prompt for one section: the section's JSON in the instruction,
    /// evidence (and optional extra context) as excerpts
    pub fn section_prefill(
        &self,
        policy: &ContextPolicy,
        section_json: &str,
        evidence: &[String],
        additional_context: Option<&str>,
    ) -> PromptContext {
        let instruction = format!("{}\n\nCurrent section JSON:\n{}", policy.default_prompt, section_json);

        let mut parts: Vec<String> = evidence.to_vec();
        if let Some(extra) = additional_context.filter(|s| !s.trim().is_empty()) {
            parts.push(format!("Additional context:\n{}", extra));
        }

        self.assemble(&instruction, parts, policy.separator)
    }
}
