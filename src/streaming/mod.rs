//! Ollama backend module
//!
//! Provides the Ollama API clients and the incremental NDJSON parser.

pub mod blocking;
pub mod client;
pub mod parser;

// Re-export commonly used types
pub use blocking::BlockingOllamaClient;
pub use client::{OllamaClient, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
pub use parser::{GenerateChunk, NdjsonParser, MAX_BUFFER_SIZE};
