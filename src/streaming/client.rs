//! Ollama API client
//!
//! Generation and embedding backend over the Ollama HTTP API:
//! - Generation: POST /api/generate (batch, or NDJSON streaming)
//! - Embeddings: POST /api/embed
//!
//! The assembled context travels as the system prompt and the question as
//! the user prompt. Context-length overflow is reported as
//! `AssistError::TokenLimitExceeded` so callers can degrade and retry.

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use crate::backends::{ChunkStream, EmbeddingBackend, GenerationBackend};
use crate::errors::{AssistError, Result};
use crate::streaming::parser::{parse_chunk, GenerateChunk, NdjsonParser};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Error text fragments Ollama uses when a prompt does not fit the model
const TOKEN_LIMIT_MARKERS: [&str; 4] = ["context length", "context window", "token limit", "too many tokens"];

/// Ollama client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OllamaClient {
    /// Create new Ollama client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_TIMEOUT)
    }

    /// Create Ollama client with custom configuration
    pub fn with_config(base_url: &str, model: &str, embedding_model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: embedding_model.to_string(),
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_request(&self, question: &str, context: &str, stream: bool) -> GenerateRequest {
        GenerateRequest::new(&self.model, question, context, stream)
    }

    async fn post_generate(&self, request: &GenerateRequest) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AssistError::Generation(format!("Failed to send request: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_failure(Some(status), &body))
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn complete(&self, question: &str, context: &str) -> Result<String> {
        let request = self.generate_request(question, context, false);
        debug!(model = self.model.as_str(), "ollama batch generate");

        let chunk: GenerateChunk = self
            .post_generate(&request)
            .await?
            .json()
            .await
            .map_err(|e| AssistError::Generation(format!("Failed to decode response: {}", e)))?;

        match chunk.error {
            Some(message) => Err(classify_failure(None, &message)),
            None => Ok(chunk.response),
        }
    }

    async fn complete_stream(&self, question: &str, context: &str) -> Result<ChunkStream> {
        let request = self.generate_request(question, context, true);
        debug!(model = self.model.as_str(), "ollama streaming generate");

        let bytes = self
            .post_generate(&request)
            .await?
            .bytes_stream()
            .map(|result| {
                result
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| AssistError::Streaming(e.to_string()))
            });

        Ok(decode_stream(Box::pin(bytes)))
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssistError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: self.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistError::Embedding(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistError::Embedding(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AssistError::Embedding(format!("Failed to decode embeddings: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AssistError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

struct DecodeState {
    bytes: ByteStream,
    parser: NdjsonParser,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl DecodeState {
    /// Queue the outcome of one NDJSON line. Returns false once the answer is over.
    fn accept(&mut self, line: &str) -> bool {
        match parse_chunk(line) {
            Ok(GenerateChunk { error: Some(message), .. }) => {
                self.pending.push_back(Err(classify_failure(None, &message)));
                false
            }
            Ok(chunk) => {
                if !chunk.response.is_empty() {
                    self.pending.push_back(Ok(chunk.response));
                }
                !chunk.done
            }
            Err(e) => {
                self.pending.push_back(Err(e));
                false
            }
        }
    }
}

/// Turn raw NDJSON bytes into answer text chunks. The stream ends after
/// the `done` record or the first error.
fn decode_stream(bytes: ByteStream) -> ChunkStream {
    let state = DecodeState {
        bytes,
        parser: NdjsonParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => match state.parser.push(&bytes) {
                    Ok(lines) => {
                        for line in lines {
                            if !state.accept(&line) {
                                state.finished = true;
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        state.pending.push_back(Err(e));
                        state.finished = true;
                    }
                },
                Some(Err(e)) => {
                    state.pending.push_back(Err(e));
                    state.finished = true;
                }
                None => {
                    if let Some(line) = state.parser.finish() {
                        state.accept(&line);
                    }
                    state.finished = true;
                }
            }
        }
    }))
}

/// Map a failed generation to the matching error variant
pub fn classify_failure(status: Option<StatusCode>, message: &str) -> AssistError {
    let lower = message.to_lowercase();
    let overflow = status == Some(StatusCode::PAYLOAD_TOO_LARGE)
        || TOKEN_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker));

    match (overflow, status) {
        (true, _) => AssistError::TokenLimitExceeded(message.to_string()),
        (false, Some(status)) => AssistError::Generation(format!("HTTP {}: {}", status, message)),
        (false, None) => AssistError::Generation(message.to_string()),
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

impl GenerateRequest {
    pub(crate) fn new(model: &str, question: &str, context: &str, stream: bool) -> Self {
        Self {
            model: model.to_string(),
            prompt: question.to_string(),
            system: (!context.is_empty()).then(|| context.to_string()),
            stream,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(parts: Vec<Result<&'static str>>) -> ByteStream {
        Box::pin(stream::iter(
            parts.into_iter().map(|p| p.map(|s| s.as_bytes().to_vec())),
        ))
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.embedding_model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            OllamaClient::with_config("http://localhost:11434/", "llama3", "mxbai-embed-large", DEFAULT_TIMEOUT)
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_generate_request_shape() {
        let client = OllamaClient::new().unwrap();
        let json = serde_json::to_value(client.generate_request("Why?", "Instruction", true)).unwrap();
        assert_eq!(json["prompt"], "Why?");
        assert_eq!(json["system"], "Instruction");
        assert_eq!(json["stream"], true);

        let json = serde_json::to_value(client.generate_request("Hi", "", false)).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(Some(StatusCode::PAYLOAD_TOO_LARGE), "too big").is_token_limit());
        assert!(classify_failure(
            Some(StatusCode::BAD_REQUEST),
            "input exceeds the model's Context Length"
        )
        .is_token_limit());
        assert!(classify_failure(None, "token limit reached").is_token_limit());

        let other = classify_failure(Some(StatusCode::SERVICE_UNAVAILABLE), "loading model");
        assert!(matches!(other, AssistError::Generation(_)));
    }

    #[tokio::test]
    async fn test_decode_stream_joins_split_records() {
        let chunks: Vec<String> = decode_stream(byte_stream(vec![
            Ok("{\"response\":\"Hel\"}\n{\"resp"),
            Ok("onse\":\"lo\"}\n"),
            Ok("{\"response\":\"\",\"done\":true}\n{\"response\":\"ignored\"}\n"),
        ]))
        .map(|r| r.unwrap())
        .collect()
        .await;

        assert_eq!(chunks, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_decode_stream_error_record_ends_stream() {
        let items: Vec<Result<String>> = decode_stream(byte_stream(vec![
            Ok("{\"response\":\"a\"}\n{\"error\":\"context length exceeded\"}\n"),
            Ok("{\"response\":\"b\"}\n"),
        ]))
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(s) if s == "a"));
        assert!(matches!(&items[1], Err(e) if e.is_token_limit()));
    }

    #[tokio::test]
    async fn test_decode_stream_trailing_record_without_newline() {
        let chunks: Vec<String> = decode_stream(byte_stream(vec![Ok("{\"response\":\"end\",\"done\":true}")]))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["end"]);
    }

    #[tokio::test]
    async fn test_decode_stream_transport_error() {
        let items: Vec<Result<String>> = decode_stream(byte_stream(vec![
            Ok("{\"response\":\"a\"}\n"),
            Err(AssistError::Streaming("reset".into())),
        ]))
        .collect()
        .await;
        assert!(matches!(items.last(), Some(Err(AssistError::Streaming(_)))));
    }
}
