//! Retrieval-augmented generation
//!
//! - Retrieval: embedding and bounded vector search over document artifacts
//! - Context: prompt assembly from instructions and excerpts
//! - Indexing: embedding stored artifacts into the vector index
//! - Pipeline: per-context-type orchestration

pub mod context;
pub mod indexing;
pub mod pipeline;
pub mod retrieval;

// Re-export key types
pub use context::{PromptAssembler, PromptContext};
pub use indexing::ArtifactIndexer;
pub use pipeline::{RagOrchestrator, NO_ARTIFACTS_MESSAGE, NO_RELEVANT_ARTIFACTS_MESSAGE};
pub use retrieval::{Retriever, SearchParams};
