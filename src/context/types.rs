//! Context types
//!
//! The fixed set of request kinds the assistant serves. Each carries a
//! canonical name (used to tag logs and telemetry) and the instruction
//! prompt used when no retrieved evidence is available.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AssistError;

const CHAT_PROMPT: &str = "You are BrdBuddy, an onboarding assistant for business requirements documents. \
Answer the user's question clearly and concisely. If you do not know the answer, say so.";

const SUMMARY_PROMPT: &str = "Summarize the following business requirements document. \
Organize the summary under these headings:
## Purpose
## Scope
## Key Requirements
## Stakeholders
## Timelines
## Risks and Dependencies";

const TEMPLATE_PROMPT: &str = "Classify the document summary below against the candidate templates. \
Respond with a JSON array of objects with the fields \"ruleName\" (the template name), \
\"similarity\" (0-100) and \"explanation\", ordered by similarity. \
Respond with [] when no template applies.";

const DECISION_PROMPT: &str = "Using only the document excerpts below, make a decision on the user's question. \
State the decision first, then justify it with references to the excerpts. \
If the excerpts are insufficient, say so.";

const PREFILL_PROMPT: &str = "You are filling in a section of a structured onboarding form. \
Using the evidence below, update the section JSON. Keep the same keys and structure, \
fill only values supported by the evidence, and respond with the updated JSON object only.";

/// Request kind that selects the context-construction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextType {
    Chat,
    Summary,
    Template,
    Decision,
    Prefill,
}

impl ContextType {
    /// All context types, in declaration order
    pub const ALL: [ContextType; 5] = [
        ContextType::Chat,
        ContextType::Summary,
        ContextType::Template,
        ContextType::Decision,
        ContextType::Prefill,
    ];

    /// Canonical name used to tag the active context
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chat => "CHAT",
            Self::Summary => "SUMMARY",
            Self::Template => "TEMPLATE",
            Self::Decision => "DECISION",
            Self::Prefill => "PREFILL",
        }
    }

    /// Instruction prompt used when no retrieval results exist
    pub fn default_prompt(&self) -> &'static str {
        match self {
            Self::Chat => CHAT_PROMPT,
            Self::Summary => SUMMARY_PROMPT,
            Self::Template => TEMPLATE_PROMPT,
            Self::Decision => DECISION_PROMPT,
            Self::Prefill => PREFILL_PROMPT,
        }
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContextType {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AssistError::InvalidInput(format!("Unknown context type: {}", s)))
    }
}
