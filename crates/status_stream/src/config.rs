use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of raw records buffered between the producer and the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// How record boundaries are marked on the wire.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// JSON values separated by optional whitespace: newline-delimited JSON,
    /// CRLF keep-alives, and back-to-back values all fall under this framing.
    #[default]
    Concatenated,
    /// Each value is preceded by its byte length in decimal on its own line
    /// (the upstream `delimited=length` convention).
    LengthPrefixed,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamLimits {
    /// Records larger than this are reported as malformed and skipped.
    pub max_record_bytes: usize,
    /// Read size requested from the transport per fill.
    pub read_chunk_bytes: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            max_record_bytes: 1024 * 1024,
            read_chunk_bytes: 8 * 1024,
        }
    }
}

/// Session configuration.
///
/// Every field has a default, so an empty TOML document is a valid config:
///
/// ```toml
/// queue_capacity = 50
/// framing = "length_prefixed"
/// max_record_bytes = 65536
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upper bound on buffered records; also the drop threshold.
    pub queue_capacity: usize,
    pub framing: Framing,
    #[serde(flatten)]
    pub limits: StreamLimits,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            framing: Framing::default(),
            limits: StreamLimits::default(),
        }
    }
}

impl StreamConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.limits.max_record_bytes == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "max_record_bytes",
            });
        }
        if self.limits.read_chunk_bytes == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "read_chunk_bytes",
            });
        }
        Ok(())
    }
}
