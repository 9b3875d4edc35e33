//! Guidance response parser
//!
//! Generation output for semantic matching comes back in one of two JSON
//! shapes:
//!
//! ```text
//! {"results": [{"rule": .., "field": .., "isRelevant": true, "explanation": ..}]}
//! [{"ruleName": .., "mappingKey": .., "similarity": 87, "explanation": ..}]
//! ```
//!
//! Parsing is total: anything that is not one of those shapes yields an
//! empty list, never an error. [`ResponseParser::interpret`] reads an answer
//! under a context's response contract; only strict JSON can fail there.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ResponseContract;
use crate::errors::{AssistError, Result};

/// Similarity reported for a relevant rule in the results-wrapper shape
const RELEVANT_SIMILARITY: &str = "100";

/// One matched rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceRecord {
    pub rule_name: Option<String>,
    pub mapping_key: Option<String>,
    pub similarity: Option<String>,
    pub explanation: Option<String>,
}

/// Recognized response layouts
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// Object root with a `results` array
    ResultsWrapper(Vec<Value>),
    /// Array root
    BareArray(Vec<Value>),
}

impl ResponseShape {
    /// Classify a parsed JSON document; `None` for anything else
    pub fn detect(root: Value) -> Option<Self> {
        match root {
            Value::Array(items) => Some(ResponseShape::BareArray(items)),
            Value::Object(mut obj) => match obj.remove("results") {
                Some(Value::Array(items)) => Some(ResponseShape::ResultsWrapper(items)),
                _ => None,
            },
            _ => None,
        }
    }

    fn into_records(self) -> Vec<GuidanceRecord> {
        match self {
            ResponseShape::ResultsWrapper(items) => objects(items).map(|obj| from_wrapper_entry(&obj)).collect(),
            ResponseShape::BareArray(items) => objects(items).map(|obj| from_array_entry(&obj)).collect(),
        }
    }
}

/// Generation answer as read under a response contract
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnswer {
    Text(String),
    Matches(Vec<GuidanceRecord>),
    Json(Value),
}

impl ParsedAnswer {
    /// Guidance records carried by the answer; free text carries none
    pub fn into_matches(self) -> Vec<GuidanceRecord> {
        match self {
            ParsedAnswer::Matches(records) => records,
            ParsedAnswer::Json(root) => ResponseShape::detect(root)
                .map(ResponseShape::into_records)
                .unwrap_or_default(),
            ParsedAnswer::Text(_) => Vec::new(),
        }
    }

    /// The answer as a JSON node
    pub fn into_json(self) -> Value {
        match self {
            ParsedAnswer::Json(value) => value,
            ParsedAnswer::Text(text) => Value::String(text),
            ParsedAnswer::Matches(records) => Value::Array(
                records
                    .into_iter()
                    .filter_map(|record| serde_json::to_value(record).ok())
                    .collect(),
            ),
        }
    }
}

/// Parser for guidance responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw generation output into guidance records
    pub fn parse(&self, raw: &str) -> Vec<GuidanceRecord> {
        let body = strip_code_fence(raw);
        if body.is_empty() {
            return Vec::new();
        }

        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(ResponseShape::detect)
            .map(ResponseShape::into_records)
            .unwrap_or_default()
    }

    /// Read an answer the way `contract` requires.
    ///
    /// Free text is kept verbatim and match lists are parsed leniently.
    /// Strict JSON must parse (after code-fence stripping) or the call fails
    /// with [`AssistError::AiResponseParse`].
    pub fn interpret(&self, contract: ResponseContract, raw: &str) -> Result<ParsedAnswer> {
        match contract {
            ResponseContract::FreeText => Ok(ParsedAnswer::Text(raw.to_string())),
            ResponseContract::MatchList => Ok(ParsedAnswer::Matches(self.parse(raw))),
            ResponseContract::StrictJson => serde_json::from_str::<Value>(strip_code_fence(raw))
                .map(ParsedAnswer::Json)
                .map_err(|e| AssistError::AiResponseParse(e.to_string())),
        }
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn objects(items: Vec<Value>) -> impl Iterator<Item = Map<String, Value>> {
    items.into_iter().filter_map(|item| match item {
        Value::Object(obj) => Some(obj),
        _ => None,
    })
}

fn from_wrapper_entry(obj: &Map<String, Value>) -> GuidanceRecord {
    let relevant = obj.get("isRelevant").and_then(Value::as_bool).unwrap_or(false);

    GuidanceRecord {
        rule_name: text_field(obj, "rule"),
        mapping_key: text_field(obj, "field"),
        similarity: relevant.then(|| RELEVANT_SIMILARITY.to_string()),
        explanation: text_field(obj, "explanation"),
    }
}

fn from_array_entry(obj: &Map<String, Value>) -> GuidanceRecord {
    GuidanceRecord {
        rule_name: text_field(obj, "ruleName"),
        mapping_key: text_field(obj, "mappingKey"),
        similarity: text_field(obj, "similarity"),
        explanation: text_field(obj, "explanation"),
    }
}

/// Strings verbatim, numbers and booleans in their JSON text form
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
