//! Side channel for per-record faults.
//!
//! Nothing reported here ever reaches the event sequence. Every report bumps a
//! session counter and is forwarded to a [`DiagnosticSink`], which decides how
//! (or whether) to surface it.

use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DiagnosticKind {
    /// The relay queue was full and an incoming record was dropped.
    QueueOverflow,
    /// A record could not be parsed as JSON and was skipped.
    MalformedRecord,
    /// A record parsed but did not fit its variant's shape.
    DecodeFailure,
    /// A record matched no known variant and was delivered as `Event::Unknown`.
    UnknownRecord,
    /// The byte stream ended or failed.
    StreamClosed,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueOverflow => "queue_overflow",
            Self::MalformedRecord => "malformed_record",
            Self::DecodeFailure => "decode_failure",
            Self::UnknownRecord => "unknown_record",
            Self::StreamClosed => "stream_closed",
        }
    }
}

pub trait DiagnosticSink: Send + Sync + 'static {
    fn report(&self, kind: DiagnosticKind, detail: &str);
}

/// Default sink: structured `tracing` events under the `status_stream` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, kind: DiagnosticKind, detail: &str) {
        match kind {
            DiagnosticKind::QueueOverflow
            | DiagnosticKind::MalformedRecord
            | DiagnosticKind::DecodeFailure => {
                warn!(kind = kind.as_str(), detail, "status stream record skipped");
            }
            DiagnosticKind::UnknownRecord => {
                debug!(kind = kind.as_str(), detail, "unrecognized status stream record");
            }
            DiagnosticKind::StreamClosed => {
                info!(kind = kind.as_str(), detail, "status stream closed");
            }
        }
    }
}

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StatsSnapshot {
    /// Complete records read off the wire (accepted or dropped).
    pub records_read: u64,
    pub records_dropped: u64,
    pub malformed_records: u64,
    pub decode_failures: u64,
    pub unknown_records: u64,
    /// Events handed to the consumer, `Unknown` included.
    pub events_delivered: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SessionStats {
    records_read: AtomicU64,
    records_dropped: AtomicU64,
    malformed_records: AtomicU64,
    decode_failures: AtomicU64,
    unknown_records: AtomicU64,
    events_delivered: AtomicU64,
}

impl SessionStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_read: self.records_read.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            unknown_records: self.unknown_records.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Lifecycle of a stream session. Transitions only move forward.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    Connected = 0,
    /// The byte stream is gone; buffered records are still being handed out.
    Draining = 1,
    /// Nothing buffered and nothing more will arrive.
    Closed = 2,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connected,
            1 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Session-scoped state shared by the producer task and the consumer handle.
pub(crate) struct SessionContext {
    state: AtomicU8,
    stats: SessionStats,
    sink: Arc<dyn DiagnosticSink>,
}

impl SessionContext {
    pub(crate) fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            state: AtomicU8::new(SessionState::Connected as u8),
            stats: SessionStats::default(),
            sink,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn advance(&self, next: SessionState) {
        let previous = SessionState::from_u8(self.state.fetch_max(next as u8, Ordering::AcqRel));
        if previous < next {
            debug!(from = ?previous, to = ?next, "status stream session state changed");
        }
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn record_read(&self) {
        SessionStats::bump(&self.stats.records_read);
    }

    pub(crate) fn event_delivered(&self) {
        SessionStats::bump(&self.stats.events_delivered);
    }

    pub(crate) fn report(&self, kind: DiagnosticKind, detail: &str) {
        match kind {
            DiagnosticKind::QueueOverflow => SessionStats::bump(&self.stats.records_dropped),
            DiagnosticKind::MalformedRecord => SessionStats::bump(&self.stats.malformed_records),
            DiagnosticKind::DecodeFailure => SessionStats::bump(&self.stats.decode_failures),
            DiagnosticKind::UnknownRecord => SessionStats::bump(&self.stats.unknown_records),
            DiagnosticKind::StreamClosed => {}
        }
        self.sink.report(kind, detail);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(DiagnosticKind, String)>>);

    impl DiagnosticSink for Recorder {
        fn report(&self, kind: DiagnosticKind, detail: &str) {
            self.0.lock().unwrap().push((kind, detail.to_string()));
        }
    }

    #[test]
    fn reports_bump_counters_and_reach_sink() {
        let recorder = Arc::new(Recorder::default());
        let ctx = SessionContext::new(recorder.clone());

        ctx.record_read();
        ctx.report(DiagnosticKind::QueueOverflow, "dropped");
        ctx.report(DiagnosticKind::MalformedRecord, "bad");
        ctx.report(DiagnosticKind::StreamClosed, "eof");

        let stats = ctx.stats();
        assert_eq!(stats.records_read, 1);
        assert_eq!(stats.records_dropped, 1);
        assert_eq!(stats.malformed_records, 1);
        assert_eq!(stats.decode_failures, 0);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], (DiagnosticKind::StreamClosed, "eof".to_string()));
    }

    #[test]
    fn state_never_moves_backwards() {
        let ctx = SessionContext::new(Arc::new(TracingSink));
        assert_eq!(ctx.state(), SessionState::Connected);

        ctx.advance(SessionState::Closed);
        ctx.advance(SessionState::Draining);
        assert_eq!(ctx.state(), SessionState::Closed);
    }
}
