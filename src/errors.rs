//! Error types for BrdBuddy
//!
//! One error enum for the whole orchestration core. Collaborator failures
//! keep their own variants so callers can tell an embedding outage from a
//! vector-search outage without string matching.

use thiserror::Error;

/// Main error type for the RAG orchestration core
#[derive(Error, Debug)]
pub enum AssistError {
    /// Caller broke a contract (null context type, missing arguments)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A looked-up entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Generation backend rejected the prompt as too large
    #[error("Token limit exceeded: {0}")]
    TokenLimitExceeded(String),

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector search backend errors
    #[error("Vector search error: {0}")]
    VectorSearch(String),

    /// Generation backend errors (anything except token overflow)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Artifact store errors
    #[error("Artifact store error: {0}")]
    ArtifactStore(String),

    /// Template catalog errors
    #[error("Template catalog error: {0}")]
    TemplateCatalog(String),

    /// BRD record store errors
    #[error("BRD store error: {0}")]
    BrdStore(String),

    /// Streaming errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Generation answer was not the JSON the prefill workflow requires
    #[error("Error parsing AI response JSON: {0}")]
    AiResponseParse(String),

    /// Worker pool was disposed before the task could be scheduled
    #[error("Worker pool has been disposed")]
    PoolDisposed,

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("Assistant error: {0}")]
    Generic(String),
}

impl AssistError {
    /// Whether this error is the backend's token/context-length overflow signal
    pub fn is_token_limit(&self) -> bool {
        matches!(self, AssistError::TokenLimitExceeded(_))
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        AssistError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, AssistError>;

/// Convert anyhow errors to AssistError
impl From<anyhow::Error> for AssistError {
    fn from(err: anyhow::Error) -> Self {
        AssistError::Generic(err.to_string())
    }
}
