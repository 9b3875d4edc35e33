//! Streaming generation results
//!
//! A [`GenerationStream`] yields the backend's chunks in order. A forwarding
//! task pulls from the backend into a bounded channel and stops as soon as
//! the consumer goes away. Completion is only recorded when the consumer
//! actually reaches the end of the stream; a cancelled or dropped stream
//! never counts as completed.

use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

use crate::backends::ChunkStream;
use crate::context::ContextType;
use crate::errors::{AssistError, Result};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Default channel capacity between backend and consumer
pub const DEFAULT_STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Finished,
    Failed,
    Cancelled,
}

/// Ordered, finite, non-restartable sequence of generated chunks
pub struct GenerationStream {
    receiver: mpsc::Receiver<Result<String>>,
    state: StreamState,
    delivered: usize,
    context: ContextType,
    telemetry: TelemetryCollector,
    started: Instant,
}

impl GenerationStream {
    /// Start forwarding `source` into a new stream
    pub(crate) fn spawn(
        context: ContextType,
        source: ChunkStream,
        telemetry: TelemetryCollector,
        buffer: usize,
    ) -> Self {
        let (tx, receiver) = mpsc::channel(buffer.max(1));
        tokio::spawn(forward(source, tx));

        Self {
            receiver,
            state: StreamState::Open,
            delivered: 0,
            context,
            telemetry,
            started: Instant::now(),
        }
    }

    /// Stop the stream. No further chunks are yielded and the stream is not
    /// recorded as completed.
    pub fn cancel(&mut self) {
        if self.state != StreamState::Open {
            return;
        }
        self.state = StreamState::Cancelled;
        self.receiver.close();

        debug!(context = self.context.name(), delivered = self.delivered, "generation stream cancelled");
        self.telemetry.record(TelemetryEvent::StreamCancelled {
            context: self.context,
            chunks_delivered: self.delivered,
            timestamp: Instant::now(),
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == StreamState::Cancelled
    }

    /// Whether the consumer has seen the end of a successful stream
    pub fn is_finished(&self) -> bool {
        self.state == StreamState::Finished
    }

    /// Chunks handed to the consumer so far
    pub fn chunks_delivered(&self) -> usize {
        self.delivered
    }

    /// Drain the stream into one string
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

impl Stream for GenerationStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state != StreamState::Open {
            return Poll::Ready(None);
        }

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.delivered += 1;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.state = StreamState::Failed;
                this.telemetry.record(TelemetryEvent::GenerationFailed {
                    context: this.context,
                    token_limit: e.is_token_limit(),
                    timestamp: Instant::now(),
                });
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.state = StreamState::Finished;
                this.telemetry.record(TelemetryEvent::GenerationCompleted {
                    context: this.context,
                    streaming: true,
                    duration_ms: this.started.elapsed().as_millis() as u64,
                    timestamp: Instant::now(),
                });
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for GenerationStream {
    fn drop(&mut self) {
        // Abandoning a stream midway is a cancellation
        self.cancel();
    }
}

/// Pump backend chunks into the channel until the source ends, an error is
/// forwarded, or the consumer hangs up
async fn forward(mut source: ChunkStream, tx: mpsc::Sender<Result<String>>) {
    loop {
        tokio::select! {
            _ = tx.closed() => return,
            next = source.next() => match next {
                Some(item) => {
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                }
                None => return,
            },
        }
    }
}

/// Result of a generation call
pub enum GenerationResult {
    /// Batch answer
    Complete(String),
    /// Streamed answer
    Stream(GenerationStream),
}

impl GenerationResult {
    pub fn is_streaming(&self) -> bool {
        matches!(self, GenerationResult::Stream(_))
    }

    /// Full answer text, draining the stream if needed
    pub async fn into_text(self) -> Result<String> {
        match self {
            GenerationResult::Complete(text) => Ok(text),
            GenerationResult::Stream(stream) => stream.collect_text().await,
        }
    }

    /// The stream, or an error for batch results
    pub fn into_stream(self) -> Result<GenerationStream> {
        match self {
            GenerationResult::Stream(stream) => Ok(stream),
            GenerationResult::Complete(_) => Err(AssistError::Streaming(
                "batch result cannot be consumed as a stream".to_string(),
            )),
        }
    }
}
