//! Section prefill
//!
//! Fills structured form sections from retrieved document evidence.

pub mod engine;

pub use engine::{SectionPrefillEngine, SectionUpdate};
