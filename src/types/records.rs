//! Records shared with external collaborators
//!
//! Retrieved evidence, template descriptors from the catalog, BRD records
//! from the record store and rule descriptors for semantic matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of retrieved evidence.
///
/// Only the ordinal rank from the search survives; scores are dropped once
/// the top-K cut has been made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedExcerpt {
    pub text: String,
    /// Zero-based position in the search result
    pub rank: usize,
}

impl RetrievedExcerpt {
    pub fn new(text: impl Into<String>, rank: usize) -> Self {
        Self {
            text: text.into(),
            rank,
        }
    }
}

/// Template definition supplied by the template catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Business requirements document as held by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrdRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Structured form sections
    #[serde(default)]
    pub sections: Value,
    /// Per-site details; optional and often the bulk of the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Rule to match a document against during semantic matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_key: Option<String>,
}
