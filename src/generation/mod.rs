//! Generation module
//!
//! Gateway to the generation backend, streamed results and the bounded
//! worker pool for blocking backends.

pub mod gateway;
pub mod pool;
pub mod stream;

// Re-export commonly used types
pub use gateway::{DegradablePayload, GenerationGateway, GenerationMode};
pub use pool::{PooledBackend, WorkerPool};
pub use stream::{GenerationResult, GenerationStream};
