//! BRD summary use case
//!
//! Summarizes a stored BRD record. When the record is too large for the
//! backend, the per-site details are dropped and the summary is retried
//! once; if that still overflows the result is a FAILED record rather than
//! an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::backends::BrdStore;
use crate::context::{ContextPolicy, ContextStrategy, ContextType};
use crate::errors::{AssistError, Result};
use crate::generation::{DegradablePayload, GenerationGateway};
use crate::rag::context::PromptAssembler;
use crate::types::BrdRecord;

/// Message on a summary abandoned after the degraded retry
pub const TOKEN_LIMIT_MESSAGE: &str = "Token limit exceeded. Fields set to null.";

const SUMMARY_QUESTION: &str = "Summarize this business requirements document.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryStatus {
    Success,
    Failed,
}

/// Outcome of a BRD summary request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrdSummaryResult {
    pub brd_id: String,
    pub status: SummaryStatus,
    pub summary: Option<String>,
    pub message: Option<String>,
}

impl BrdSummaryResult {
    fn success(brd_id: &str, summary: String) -> Self {
        Self {
            brd_id: brd_id.to_string(),
            status: SummaryStatus::Success,
            summary: Some(summary),
            message: None,
        }
    }

    fn token_limit(brd_id: &str) -> Self {
        Self {
            brd_id: brd_id.to_string(),
            status: SummaryStatus::Failed,
            summary: None,
            message: Some(TOKEN_LIMIT_MESSAGE.to_string()),
        }
    }
}

/// BRD record rendered as summary context; site details are the part
/// that can be dropped
struct BrdPayload {
    record: BrdRecord,
    policy: ContextPolicy,
    assembler: PromptAssembler,
}

impl DegradablePayload for BrdPayload {
    fn render(&self) -> Result<String> {
        let body = serde_json::to_string_pretty(&self.record)?;
        Ok(self.assembler.assemble_for(&self.policy, [body]).into_string())
    }

    fn degrade(&self) -> Option<Self> {
        self.record.site_details.as_ref()?;
        Some(Self {
            record: BrdRecord {
                site_details: None,
                ..self.record.clone()
            },
            policy: self.policy,
            assembler: self.assembler,
        })
    }
}

/// Summarizes BRD records from the record store
#[derive(Clone)]
pub struct BrdSummaryService {
    brds: Arc<dyn BrdStore>,
    gateway: GenerationGateway,
    strategy: ContextStrategy,
    assembler: PromptAssembler,
}

impl BrdSummaryService {
    pub fn new(brds: Arc<dyn BrdStore>, gateway: GenerationGateway) -> Self {
        Self {
            brds,
            gateway,
            strategy: ContextStrategy::new(),
            assembler: PromptAssembler::new(),
        }
    }

    /// Summarize one BRD.
    ///
    /// Fails with `NotFound` for an unknown id. A token-limit overflow that
    /// survives the degraded retry becomes a FAILED result.
    pub async fn summarize(&self, brd_id: &str) -> Result<BrdSummaryResult> {
        let record = self
            .brds
            .find_by_id(brd_id)
            .await?
            .ok_or_else(|| AssistError::not_found("BRD", brd_id))?;

        let payload = BrdPayload {
            record,
            policy: self.strategy.policy_for(ContextType::Summary),
            assembler: self.assembler,
        };

        match self
            .gateway
            .complete_degradable(ContextType::Summary, SUMMARY_QUESTION, &payload)
            .await
        {
            Ok(summary) => {
                info!(brd_id, "BRD summary generated");
                Ok(BrdSummaryResult::success(brd_id, summary))
            }
            Err(e) if e.is_token_limit() => {
                warn!(brd_id, error = %e, "BRD summary abandoned after token limit");
                Ok(BrdSummaryResult::token_limit(brd_id))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::GenerationBackend;
    use crate::store::memory::InMemoryBrdStore;
    use crate::telemetry::TelemetryCollector;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Overflows whenever the context mentions site details
    struct SiteSensitive {
        contexts: Mutex<Vec<String>>,
        always_overflow: bool,
    }

    #[async_trait]
    impl GenerationBackend for SiteSensitive {
        async fn complete(&self, _question: &str, context: &str) -> Result<String> {
            self.contexts.lock().unwrap().push(context.to_string());
            if self.always_overflow || context.contains("siteDetails") {
                Err(AssistError::TokenLimitExceeded("context length exceeded".into()))
            } else {
                Ok("Short summary".into())
            }
        }
    }

    fn record(site_details: Option<serde_json::Value>) -> BrdRecord {
        BrdRecord {
            id: "brd-7".into(),
            title: "Merchant onboarding".into(),
            description: "Onboard merchants in three regions".into(),
            sections: json!({"scope": "EU"}),
            site_details,
            updated_at: None,
        }
    }

    async fn service(record: BrdRecord, always_overflow: bool) -> (BrdSummaryService, Arc<SiteSensitive>) {
        let store = Arc::new(InMemoryBrdStore::new());
        store.insert(record).await;
        let backend = Arc::new(SiteSensitive {
            contexts: Mutex::new(Vec::new()),
            always_overflow,
        });
        let gateway = GenerationGateway::new(backend.clone(), TelemetryCollector::new());
        (BrdSummaryService::new(store, gateway), backend)
    }

    #[tokio::test]
    async fn test_summary_succeeds_after_dropping_site_details() {
        let (service, backend) = service(record(Some(json!([{"site": "Berlin"}]))), false).await;

        let result = service.summarize("brd-7").await.unwrap();
        assert_eq!(result.status, SummaryStatus::Success);
        assert_eq!(result.summary.as_deref(), Some("Short summary"));

        let contexts = backend.contexts.lock().unwrap();
        assert_eq!(contexts.len(), 2);
        assert!(!contexts[1].contains("siteDetails"));
        assert!(contexts[1].starts_with(ContextType::Summary.default_prompt()));
    }

    #[tokio::test]
    async fn test_second_overflow_gives_failed_record() {
        let (service, backend) = service(record(Some(json!({"sites": 40}))), true).await;

        let result = service.summarize("brd-7").await.unwrap();
        assert_eq!(result.status, SummaryStatus::Failed);
        assert_eq!(result.summary, None);
        assert_eq!(result.message.as_deref(), Some(TOKEN_LIMIT_MESSAGE));
        assert_eq!(backend.contexts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overflow_without_site_details_fails_without_retry() {
        let (service, backend) = service(record(None), true).await;

        let result = service.summarize("brd-7").await.unwrap();
        assert_eq!(result.status, SummaryStatus::Failed);
        assert_eq!(backend.contexts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_brd_is_not_found() {
        let (service, _) = service(record(None), false).await;
        let err = service.summarize("missing").await.unwrap_err();
        assert!(matches!(err, AssistError::NotFound { .. }));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let result = BrdSummaryResult::token_limit("b1");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["brdId"], "b1");
    }
}
