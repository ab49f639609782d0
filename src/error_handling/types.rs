use thiserror::Error;

/// Failures raised while turning observed bytes into a capture record.
///
/// None of these are fatal: the dispatcher logs them and keeps observing.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Observed bytes were not valid UTF-8; a lossy decoding was used instead.
    #[error("decode failure: invalid UTF-8 at byte offset {offset}")]
    DecodeFailure { offset: usize },
    /// The delimited span could not be parsed as JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// JSON parsed but the expected nested text field is absent.
    #[error("payload shape mismatch: missing {path}")]
    ShapeMismatch { path: String },
    /// No host could be attributed to the payload.
    #[error("attribution unavailable")]
    AttributionUnavailable,
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::MalformedPayload(err.to_string())
    }
}

impl From<std::str::Utf8Error> for CaptureError {
    fn from(err: std::str::Utf8Error) -> Self {
        CaptureError::DecodeFailure {
            offset: err.valid_up_to(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Value out of range: {0}")]
    NotInRange(String),
}

#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("event source IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("undecodable event on line {line}: {reason}")]
    BadEvent { line: usize, reason: String },
    #[error("invalid base64 payload on line {line}: {reason}")]
    BadPayload { line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),
    #[error("Producer task failed: {0}")]
    TaskFailed(String),
}
