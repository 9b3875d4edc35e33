//! Structured response parsing
//!
//! Turns generation output into typed guidance records.

pub mod parser;

pub use parser::{GuidanceRecord, ParsedAnswer, ResponseParser, ResponseShape};
