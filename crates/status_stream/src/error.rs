use serde_json::Value;
use thiserror::Error;

/// Failures of a single read from the byte stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// One record was syntactically invalid; its bytes were consumed and the
    /// next read starts at the following boundary.
    #[error("malformed record: {reason}")]
    Malformed { reason: String },
    #[error("stream reached end of input")]
    EndOfStream,
    #[error("stream transport failed: {0}")]
    Transport(#[source] std::io::Error),
}

impl ReadError {
    /// Whether the session can continue reading after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// A well-formed record that did not fit the shape its marker fields claimed.
#[derive(Debug, Error)]
#[error("failed to decode {variant} record: {source}")]
pub struct DecodeError {
    pub variant: &'static str,
    #[source]
    pub source: serde_json::Error,
    /// The rejected record, kept for diagnostic replay.
    pub record: Value,
}

/// The only error surfaced to stream consumers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum StreamError {
    #[error("status stream is exhausted")]
    Exhausted,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("queue_capacity must be at least 1")]
    ZeroCapacity,
    #[error("{name} must be at least 1")]
    ZeroLimit { name: &'static str },
    #[error("failed to parse stream config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no tokio runtime available to host the stream producer: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
