//! Incremental NDJSON parser for streamed generation
//!
//! Ollama streams one JSON object per line. Network reads split those
//! lines arbitrarily, so bytes are buffered until a newline arrives:
//! - Buffer: 1MB maximum for a single unfinished line
//! - Algorithm: O(n) scan for line breaks

use serde::Deserialize;

use crate::errors::{AssistError, Result};

/// Maximum size of one unfinished line (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// One streamed generation record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateChunk {
    /// Text produced since the previous record
    #[serde(default)]
    pub response: String,
    /// Last record of the answer
    #[serde(default)]
    pub done: bool,
    /// Backend failure reported mid-stream
    #[serde(default)]
    pub error: Option<String>,
}

/// Line-oriented NDJSON parser
#[derive(Debug)]
pub struct NdjsonParser {
    /// Bytes of the line not yet terminated
    buffer: Vec<u8>,

    /// Maximum unfinished line size
    max_buffer_size: usize,
}

impl NdjsonParser {
    /// Create new parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
        }
    }

    /// Add bytes and return every line they complete, in order.
    /// Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }

        if self.buffer.len() > self.max_buffer_size {
            let size = self.buffer.len();
            self.buffer.clear();
            return Err(AssistError::Streaming(format!(
                "Buffer overflow: {} bytes exceeds maximum {}",
                size, self.max_buffer_size
            )));
        }

        Ok(lines)
    }

    /// Take whatever is left once the byte stream ends (a final line
    /// without trailing newline)
    pub fn finish(&mut self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        (!text.is_empty()).then_some(text)
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for NdjsonParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one NDJSON line
pub fn parse_chunk(line: &str) -> Result<GenerateChunk> {
    serde_json::from_str(line)
        .map_err(|e| AssistError::Streaming(format!("Malformed stream record: {}", e)))
}
