//! Type definitions module
//!
//! Records exchanged between the orchestration core and its collaborators.

pub mod records;

// Re-export commonly used types
pub use records::{BrdRecord, RetrievedExcerpt, RuleDescriptor, TemplateDescriptor};
