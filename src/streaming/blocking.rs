//! Blocking Ollama generation client
//!
//! Synchronous counterpart of [`OllamaClient`](super::OllamaClient) for
//! deployments that keep generation on a blocking HTTP stack. Every call
//! blocks its thread, so the client is only used through a
//! [`PooledBackend`](crate::generation::PooledBackend).

use std::time::Duration;
use tracing::debug;

use crate::backends::LegacyGenerationBackend;
use crate::errors::{AssistError, Result};
use crate::streaming::client::{classify_failure, GenerateRequest};
use crate::streaming::parser::GenerateChunk;

/// Batch-only Ollama client on `reqwest::blocking`
#[derive(Debug, Clone)]
pub struct BlockingOllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
}

impl BlockingOllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LegacyGenerationBackend for BlockingOllamaClient {
    fn complete(&self, question: &str, context: &str) -> Result<String> {
        // A blocking client owns its own runtime; it is created and dropped
        // on the worker thread, never on the async executor.
        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;

        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest::new(&self.model, question, context, false);
        debug!(model = self.model.as_str(), "ollama blocking generate");

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| AssistError::Generation(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_failure(Some(status), &body));
        }

        let chunk: GenerateChunk = response
            .json()
            .map_err(|e| AssistError::Generation(format!("Failed to decode response: {}", e)))?;

        match chunk.error {
            Some(message) => Err(classify_failure(None, &message)),
            None => Ok(chunk.response),
        }
    }
}
