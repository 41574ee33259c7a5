use std::sync::Arc;

use futures_core::Stream;
use tokio::{sync::Mutex, task::AbortHandle};

use crate::decode::{decode, Event};
use crate::diagnostics::{DiagnosticKind, SessionContext, SessionState, StatsSnapshot};
use crate::error::StreamError;
use crate::reader::RawRecord;
use crate::relay::RelayReceiver;

/// Consumer side of a stream session: a lazy, non-restartable sequence of [`Event`]s.
///
/// Calls are serialised internally, so a shared `&EventStream` (for example behind
/// an `Arc`) is safe to pull from concurrently. Records that fail to decode are
/// reported through the session's diagnostic sink and skipped. Once the sequence is
/// exhausted, every later call returns [`StreamError::Exhausted`].
///
/// Dropping the handle stops the background producer.
pub struct EventStream {
    ctx: Arc<SessionContext>,
    relay: Mutex<RelayReceiver>,
    producer: AbortHandle,
}

impl EventStream {
    pub(crate) fn new(
        ctx: Arc<SessionContext>,
        relay: RelayReceiver,
        producer: AbortHandle,
    ) -> Self {
        Self {
            ctx,
            relay: Mutex::new(relay),
            producer,
        }
    }

    /// Waits for the next decoded event.
    pub async fn next_event(&self) -> Result<Event, StreamError> {
        let mut relay = self.relay.lock().await;
        loop {
            if self.ctx.state() == SessionState::Closed {
                return Err(StreamError::Exhausted);
            }
            let Some(record) = relay.take().await else {
                self.ctx.advance(SessionState::Closed);
                return Err(StreamError::Exhausted);
            };
            if let Some(event) = self.resolve(record) {
                return Ok(event);
            }
        }
    }

    /// Blocking variant of [`EventStream::next_event`] for synchronous callers.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn blocking_next(&self) -> Result<Event, StreamError> {
        let mut relay = self.relay.blocking_lock();
        loop {
            if self.ctx.state() == SessionState::Closed {
                return Err(StreamError::Exhausted);
            }
            let Some(record) = relay.blocking_take() else {
                self.ctx.advance(SessionState::Closed);
                return Err(StreamError::Exhausted);
            };
            if let Some(event) = self.resolve(record) {
                return Ok(event);
            }
        }
    }

    /// Whether more events may still arrive. A `true` answer can still be followed by
    /// exhaustion if the byte stream closes before another record is read.
    pub async fn is_live(&self) -> bool {
        let relay = self.relay.lock().await;
        self.check_live(&relay)
    }

    /// Blocking variant of [`EventStream::is_live`].
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context.
    pub fn blocking_is_live(&self) -> bool {
        let relay = self.relay.blocking_lock();
        self.check_live(&relay)
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats()
    }

    /// Adapts the handle into a [`Stream`] that ends at exhaustion.
    pub fn into_stream(self) -> impl Stream<Item = Event> + Send + 'static {
        futures_util::stream::unfold(self, |events| async move {
            let event = events.next_event().await.ok()?;
            Some((event, events))
        })
    }

    /// Adapts the handle into a blocking [`Iterator`] that ends at exhaustion.
    pub fn into_blocking_iter(self) -> BlockingEvents {
        BlockingEvents { events: self }
    }

    fn check_live(&self, relay: &RelayReceiver) -> bool {
        match self.ctx.state() {
            SessionState::Connected => true,
            SessionState::Draining if !relay.is_empty() => true,
            SessionState::Draining => {
                self.ctx.advance(SessionState::Closed);
                false
            }
            SessionState::Closed => false,
        }
    }

    fn resolve(&self, record: RawRecord) -> Option<Event> {
        match decode(record) {
            Ok(event) => {
                if let Event::Unknown(raw) = &event {
                    self.ctx.report(DiagnosticKind::UnknownRecord, &raw.to_string());
                }
                self.ctx.event_delivered();
                Some(event)
            }
            Err(err) => {
                self.ctx.report(
                    DiagnosticKind::DecodeFailure,
                    &format!("{err}; record: {}", err.record),
                );
                None
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("state", &self.ctx.state())
            .field("stats", &self.ctx.stats())
            .finish()
    }
}

/// Blocking iterator returned by [`EventStream::into_blocking_iter`].
#[derive(Debug)]
pub struct BlockingEvents {
    events: EventStream,
}

impl BlockingEvents {
    pub fn stats(&self) -> StatsSnapshot {
        self.events.stats()
    }
}

impl Iterator for BlockingEvents {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.blocking_next().ok()
    }
}
