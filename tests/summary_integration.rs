//! Integration tests for BRD summaries over the JSON-file store

mod common;

use brdbuddy::generation::GenerationGateway;
use brdbuddy::store::FileBrdStore;
use brdbuddy::summary::{BrdSummaryService, SummaryStatus, TOKEN_LIMIT_MESSAGE};
use brdbuddy::telemetry::TelemetryCollector;
use brdbuddy::AssistError;
use common::ScriptedBackend;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn write_brd(dir: &TempDir, id: &str, record: serde_json::Value) {
    let brds = dir.path().join("brds");
    fs::create_dir_all(&brds).unwrap();
    fs::write(brds.join(format!("{}.json", id)), record.to_string()).unwrap();
}

fn service(dir: &TempDir, backend: Arc<ScriptedBackend>) -> (BrdSummaryService, TelemetryCollector) {
    let telemetry = TelemetryCollector::new();
    let gateway = GenerationGateway::new(backend, telemetry.clone());
    (
        BrdSummaryService::new(Arc::new(FileBrdStore::new(dir.path())), gateway),
        telemetry,
    )
}

fn overflow() -> brdbuddy::Result<String> {
    Err(AssistError::TokenLimitExceeded("prompt exceeds context length".into()))
}

#[tokio::test]
async fn test_overflow_then_success_with_site_details() {
    let dir = TempDir::new().unwrap();
    write_brd(
        &dir,
        "brd-100",
        json!({
            "id": "brd-100",
            "title": "Marketplace payouts",
            "sections": {"scope": "EU"},
            "siteDetails": [{"site": "Berlin"}, {"site": "Lyon"}]
        }),
    );
    let backend = Arc::new(ScriptedBackend::new(vec![overflow(), Ok("Retried summary".into())]));
    let (service, telemetry) = service(&dir, backend.clone());

    let result = service.summarize("brd-100").await.unwrap();

    assert_eq!(result.status, SummaryStatus::Success);
    assert_eq!(result.summary.as_deref(), Some("Retried summary"));
    assert_eq!(result.message, None);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(telemetry.get_stats().degraded_retries, 1);
}

#[tokio::test]
async fn test_overflow_without_site_details_is_failed_after_one_call() {
    let dir = TempDir::new().unwrap();
    write_brd(&dir, "brd-101", json!({"id": "brd-101", "title": "Card acquiring"}));
    let backend = Arc::new(ScriptedBackend::new(vec![overflow(), Ok("unused".into())]));
    let (service, telemetry) = service(&dir, backend.clone());

    let result = service.summarize("brd-101").await.unwrap();

    assert_eq!(result.status, SummaryStatus::Failed);
    assert_eq!(result.message.as_deref(), Some(TOKEN_LIMIT_MESSAGE));
    assert_eq!(result.message.as_deref(), Some("Token limit exceeded. Fields set to null."));
    assert_eq!(backend.call_count(), 1);
    assert_eq!(telemetry.get_stats().degraded_retries, 0);
}

#[tokio::test]
async fn test_double_overflow_is_failed() {
    let dir = TempDir::new().unwrap();
    write_brd(
        &dir,
        "brd-102",
        json!({"id": "brd-102", "title": "Payouts", "siteDetails": {"count": 300}}),
    );
    let backend = Arc::new(ScriptedBackend::new(vec![overflow(), overflow()]));
    let (service, _) = service(&dir, backend.clone());

    let result = service.summarize("brd-102").await.unwrap();
    assert_eq!(result.status, SummaryStatus::Failed);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_other_failures_are_errors() {
    let dir = TempDir::new().unwrap();
    write_brd(&dir, "brd-103", json!({"id": "brd-103", "title": "Payouts"}));
    let backend = Arc::new(ScriptedBackend::new(vec![Err(AssistError::Generation("timeout".into()))]));
    let (service, _) = service(&dir, backend.clone());

    let err = service.summarize("brd-103").await.unwrap_err();
    assert!(matches!(err, AssistError::Generation(_)));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_missing_brd_is_not_found() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new(Vec::new()));
    let (service, _) = service(&dir, backend.clone());

    let err = service.summarize("brd-404").await.unwrap_err();
    assert_eq!(err.to_string(), "BRD not found: brd-404");
    assert_eq!(backend.call_count(), 0);
}
