//! Context strategy module
//!
//! Maps each request's context type to the retrieval, prompting and
//! response-parsing policy used to serve it.

pub mod types;
pub mod strategy;

// Re-export commonly used types
pub use types::ContextType;
pub use strategy::{ContextPolicy, ContextStrategy, ResponseContract, RetrievalMode};
