//! Telemetry for the orchestration core
//!
//! Collects request-level events (retrieval, generation, retries, prefill
//! merges) and keeps running counters. Cloning a collector shares its state.
//! Only the most recent events are retained; counters cover everything.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::context::ContextType;

/// Default number of events kept in the recent-event log
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    RetrievalCompleted {
        context: ContextType,
        excerpts: usize,
        timestamp: Instant,
    },
    /// Request answered without calling generation
    ShortCircuit {
        context: ContextType,
        reason: String,
        timestamp: Instant,
    },
    GenerationStarted {
        context: ContextType,
        streaming: bool,
        timestamp: Instant,
    },
    GenerationCompleted {
        context: ContextType,
        streaming: bool,
        duration_ms: u64,
        timestamp: Instant,
    },
    GenerationFailed {
        context: ContextType,
        token_limit: bool,
        timestamp: Instant,
    },
    StreamCancelled {
        context: ContextType,
        chunks_delivered: usize,
        timestamp: Instant,
    },
    DegradedRetry {
        context: ContextType,
        timestamp: Instant,
    },
    PrefillFieldUpdated {
        field: String,
        timestamp: Instant,
    },
    PrefillFieldSkipped {
        field: String,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub retrievals: usize,
    pub short_circuits: usize,
    pub generations_started: usize,
    pub generations_completed: usize,
    pub generations_failed: usize,
    pub streams_cancelled: usize,
    pub degraded_retries: usize,
    pub fields_updated: usize,
    pub fields_skipped: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    capacity: usize,
    start_time: Instant,
}

/// Counters stay usable even if a recording thread panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Collector that keeps at most `capacity` recent events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)))),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            capacity,
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::RetrievalCompleted { .. } => stats.retrievals += 1,
                TelemetryEvent::ShortCircuit { .. } => stats.short_circuits += 1,
                TelemetryEvent::GenerationStarted { .. } => stats.generations_started += 1,
                TelemetryEvent::GenerationCompleted { .. } => stats.generations_completed += 1,
                TelemetryEvent::GenerationFailed { .. } => stats.generations_failed += 1,
                TelemetryEvent::StreamCancelled { .. } => stats.streams_cancelled += 1,
                TelemetryEvent::DegradedRetry { .. } => stats.degraded_retries += 1,
                TelemetryEvent::PrefillFieldUpdated { .. } => stats.fields_updated += 1,
                TelemetryEvent::PrefillFieldSkipped { .. } => stats.fields_skipped += 1,
            }
        }

        let mut events = lock(&self.events);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Number of retained events (never more than the capacity)
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Share of started generations that completed
    pub fn generation_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.generations_started == 0 {
            1.0
        } else {
            stats.generations_completed as f64 / stats.generations_started as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
