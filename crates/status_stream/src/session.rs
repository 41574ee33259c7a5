use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::builder::SessionBuilder;
use crate::diagnostics::{SessionContext, SessionState, StatsSnapshot};
use crate::error::SessionError;
use crate::events::EventStream;

/// Binds one byte stream to one producer task and one [`EventStream`].
///
/// The session moves `Connected` → `Draining` (byte stream gone, records still
/// buffered) → `Closed` (nothing left). A closed session never yields again.
pub struct StreamSession {
    ctx: Arc<SessionContext>,
    events: EventStream,
}

impl StreamSession {
    pub(crate) fn new(ctx: Arc<SessionContext>, events: EventStream) -> Self {
        Self { ctx, events }
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Starts a session with the default configuration on the ambient runtime.
    pub fn start<R>(reader: R) -> Result<Self, SessionError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::builder().start(reader)
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats()
    }

    pub fn events(&self) -> &EventStream {
        &self.events
    }

    pub fn into_events(self) -> EventStream {
        self.events
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.ctx.state())
            .field("stats", &self.ctx.stats())
            .finish()
    }
}
