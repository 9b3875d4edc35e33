//! BrdBuddy - RAG orchestration core for BRD onboarding
//!
//! Answers questions about onboarding documents, summarizes and classifies
//! them, and prefills structured form sections from retrieved evidence.
//!
//! # Architecture
//!
//! - **Context**: context type to retrieval/prompt/response policy
//! - **RAG**: retrieval, prompt assembly and per-context orchestration
//! - **Generation**: batch and streamed generation, degraded retry, worker pool
//! - **Response / Prefill / Summary**: structured use cases on top
//! - **Backends**: Ollama, Qdrant and JSON-file collaborators

pub mod backends;
pub mod context;
pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{AssistError, Result};

pub mod generation;
pub mod prefill;
pub mod rag;
pub mod response;
pub mod summary;
pub mod telemetry;

pub mod store;
pub mod streaming;
pub mod vector_db;

pub mod cli;
pub mod config;
pub mod logging;
