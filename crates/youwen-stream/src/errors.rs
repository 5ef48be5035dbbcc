use std::time::Duration;

/// Errors that reject a streaming operation.
///
/// Malformed payloads and pipeline-reported failures are not errors; they end up in
/// the [`PipelineRun`](crate::pipeline::PipelineRun) instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Connection-level failure while sending or reading.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// No terminal outcome within the configured budget.
    #[error("request timed out after {}s", after.as_secs())]
    Timeout { after: Duration },
    /// Server answered with a non-success status. `body` is a bounded excerpt.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl StreamError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// HTTP status for [`StreamError::Status`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short variant name, used for machine-readable error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Validation(_) => "ValidationError",
            Self::Transport { .. } => "TransportError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Status { .. } => "StatusError",
        }
    }
}
