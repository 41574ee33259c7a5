#![forbid(unsafe_code)]
//! Decoding pipeline for long-lived JSON status streams.
//!
//! A background producer reads one JSON record at a time off an async byte stream
//! and offers it to a bounded relay queue. When the queue is full the incoming
//! record is dropped and counted instead of stalling the reader, so a slow consumer
//! can never make the upstream give up on the connection. The consumer pulls from
//! an [`EventStream`], which decodes each record into an [`Event`].
//!
//! Per-record faults (overflow drops, malformed JSON, decode failures, unknown
//! records) never reach the event sequence; they go to a [`DiagnosticSink`]
//! (default: [`TracingSink`]) and the session's [`StatsSnapshot`].
//!
//! ```no_run
//! # async fn run(body: tokio::io::DuplexStream) -> Result<(), status_stream::SessionError> {
//! use status_stream::{Event, StreamSession};
//!
//! let session = StreamSession::builder().queue_capacity(50).start(body)?;
//! let events = session.events();
//! while let Ok(event) = events.next_event().await {
//!     if let Event::Status(status) = event {
//!         println!("{}", status.text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Connecting, authenticating, and reconnecting are left to the caller.

mod builder;
mod config;
mod decode;
mod diagnostics;
mod error;
mod events;
mod model;
mod producer;
mod reader;
mod relay;
mod session;

pub use builder::SessionBuilder;
pub use config::{Framing, StreamConfig, StreamLimits, DEFAULT_QUEUE_CAPACITY};
pub use decode::{decode, timestamp, Event, TIMESTAMP_FORMAT};
pub use diagnostics::{DiagnosticKind, DiagnosticSink, SessionState, StatsSnapshot, TracingSink};
pub use error::{ConfigError, DecodeError, ReadError, SessionError, StreamError};
pub use events::{BlockingEvents, EventStream};
pub use model::{
    Coordinates, DeletedStatus, Deletion, Entities, Hashtag, Media, MediaSize, Status, User,
    UserMention,
};
pub use reader::{RawRecord, RecordReader};
pub use session::StreamSession;
