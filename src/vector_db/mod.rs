//! Vector database integration
//!
//! Qdrant-backed vector search over artifact chunks.

pub mod qdrant;

pub use qdrant::{QdrantVectorStore, DEFAULT_COLLECTION, DEFAULT_QDRANT_URL};
