//! Generation gateway
//!
//! Single entry point to the generation backend. Batch calls return the
//! whole answer; stream calls hand back a [`GenerationStream`]. Token-limit
//! failures on degradable payloads get exactly one retry with the payload's
//! optional part removed. Every other failure goes straight back to the
//! caller.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::backends::GenerationBackend;
use crate::context::ContextType;
use crate::errors::Result;
use crate::generation::stream::{GenerationResult, GenerationStream, DEFAULT_STREAM_BUFFER};
use crate::rag::context::PromptContext;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// How the answer is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    Batch,
    Stream,
}

/// Generation input that can shrink once when the backend rejects it as too large
pub trait DegradablePayload: Sized {
    /// Text sent to the backend as context
    fn render(&self) -> Result<String>;

    /// Same payload with its optional, size-contributing part removed.
    /// `None` when that part is already absent.
    fn degrade(&self) -> Option<Self>;
}

/// Gateway over a generation backend
#[derive(Clone)]
pub struct GenerationGateway {
    backend: Arc<dyn GenerationBackend>,
    telemetry: TelemetryCollector,
    stream_buffer: usize,
}

impl GenerationGateway {
    pub fn new(backend: Arc<dyn GenerationBackend>, telemetry: TelemetryCollector) -> Self {
        Self {
            backend,
            telemetry,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Override the channel capacity used for streamed answers
    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer.max(1);
        self
    }

    /// Generate an answer for an assembled prompt
    pub async fn generate(
        &self,
        context_type: ContextType,
        question: &str,
        context: &PromptContext,
        mode: GenerationMode,
    ) -> Result<GenerationResult> {
        match mode {
            GenerationMode::Batch => self
                .complete(context_type, question, context.as_str())
                .await
                .map(GenerationResult::Complete),
            GenerationMode::Stream => self
                .stream(context_type, question, context.as_str())
                .await
                .map(GenerationResult::Stream),
        }
    }

    /// Batch completion of raw context text
    pub async fn complete(&self, context_type: ContextType, question: &str, context: &str) -> Result<String> {
        let started = Instant::now();
        self.telemetry.record(TelemetryEvent::GenerationStarted {
            context: context_type,
            streaming: false,
            timestamp: started,
        });
        debug!(
            context = context_type.name(),
            prompt_chars = context.len(),
            "generation requested"
        );

        match self.backend.complete(question, context).await {
            Ok(answer) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                self.telemetry.record(TelemetryEvent::GenerationCompleted {
                    context: context_type,
                    streaming: false,
                    duration_ms,
                    timestamp: Instant::now(),
                });
                debug!(context = context_type.name(), duration_ms, "generation completed");
                Ok(answer)
            }
            Err(e) => {
                self.telemetry.record(TelemetryEvent::GenerationFailed {
                    context: context_type,
                    token_limit: e.is_token_limit(),
                    timestamp: Instant::now(),
                });
                Err(e)
            }
        }
    }

    /// Streamed completion of raw context text
    pub async fn stream(&self, context_type: ContextType, question: &str, context: &str) -> Result<GenerationStream> {
        self.telemetry.record(TelemetryEvent::GenerationStarted {
            context: context_type,
            streaming: true,
            timestamp: Instant::now(),
        });
        debug!(
            context = context_type.name(),
            prompt_chars = context.len(),
            "streaming generation requested"
        );

        match self.backend.complete_stream(question, context).await {
            Ok(source) => Ok(GenerationStream::spawn(
                context_type,
                source,
                self.telemetry.clone(),
                self.stream_buffer,
            )),
            Err(e) => {
                self.telemetry.record(TelemetryEvent::GenerationFailed {
                    context: context_type,
                    token_limit: e.is_token_limit(),
                    timestamp: Instant::now(),
                });
                Err(e)
            }
        }
    }

    /// Batch completion with one degraded retry on token-limit overflow.
    ///
    /// The retry happens at most once. If the payload had nothing to drop,
    /// or the degraded payload overflows too, the overflow error is returned.
    pub async fn complete_degradable<P: DegradablePayload>(
        &self,
        context_type: ContextType,
        question: &str,
        payload: &P,
    ) -> Result<String> {
        let first = self.complete(context_type, question, &payload.render()?).await;

        let overflow = match first {
            Err(e) if e.is_token_limit() => e,
            other => return other,
        };

        let Some(degraded) = payload.degrade() else {
            warn!(context = context_type.name(), "token limit exceeded and nothing left to degrade");
            return Err(overflow);
        };

        warn!(context = context_type.name(), "token limit exceeded, retrying with degraded payload");
        self.telemetry.record(TelemetryEvent::DegradedRetry {
            context: context_type,
            timestamp: Instant::now(),
        });

        let retried = self.complete(context_type, question, &degraded.render()?).await;
        if let Err(e) = &retried {
            if e.is_token_limit() {
                warn!(context = context_type.name(), "degraded payload still exceeds token limit");
            }
        }
        retried
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }
}
