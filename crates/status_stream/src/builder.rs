use std::sync::Arc;

use tokio::{io::AsyncRead, runtime::Handle};
use tracing::debug;

use crate::config::{Framing, StreamConfig};
use crate::diagnostics::{DiagnosticSink, SessionContext, TracingSink};
use crate::error::SessionError;
use crate::events::EventStream;
use crate::producer::run_producer;
use crate::reader::RecordReader;
use crate::relay::relay;
use crate::session::StreamSession;

#[derive(Clone)]
pub struct SessionBuilder {
    pub(crate) config: StreamConfig,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    pub(crate) runtime: Option<Handle>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            config: StreamConfig::default(),
            sink: Arc::new(TracingSink),
            runtime: None,
        }
    }
}

impl SessionBuilder {
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    pub fn max_record_bytes(mut self, bytes: usize) -> Self {
        self.config.limits.max_record_bytes = bytes;
        self
    }

    /// Replaces the default [`TracingSink`].
    pub fn sink(mut self, sink: impl DiagnosticSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn shared_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runtime that hosts the producer task. Defaults to the ambient runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Validates the configuration and spawns the producer over `reader`.
    ///
    /// The producer owns `reader` exclusively; closing the underlying transport is
    /// what ends the session.
    pub fn start<R>(self, reader: R) -> Result<StreamSession, SessionError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };

        let ctx = Arc::new(SessionContext::new(self.sink));
        let (sender, receiver) = relay(self.config.queue_capacity);
        let reader = RecordReader::new(reader, self.config.framing, self.config.limits);
        let producer = runtime.spawn(run_producer(reader, sender, Arc::clone(&ctx)));

        debug!(
            queue_capacity = self.config.queue_capacity,
            framing = ?self.config.framing,
            max_record_bytes = self.config.limits.max_record_bytes,
            "started status stream session"
        );

        let events = EventStream::new(Arc::clone(&ctx), receiver, producer.abort_handle());
        Ok(StreamSession::new(ctx, events))
    }
}
