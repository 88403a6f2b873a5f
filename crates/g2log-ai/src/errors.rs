use crate::model::ProviderId;

/// Errors that end a single streaming chat request.
///
/// Every variant names the provider so a failure can be reported to the user
/// without extra context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The active profile has no API key; raised before any network I/O.
    #[error("missing API key for provider {provider}")]
    MissingCredential { provider: ProviderId },
    /// The endpoint answered with a non-success status.
    #[error("{provider} request failed with HTTP {status}: {message}")]
    Http {
        provider: ProviderId,
        status: u16,
        message: String,
    },
    /// Connection, TLS, DNS, timeout or mid-stream read failure.
    #[error("network error ({provider}): {message}")]
    Network {
        provider: ProviderId,
        message: String,
    },
    /// The request could not be built (for example an unusable endpoint URL).
    #[error("config error ({provider}): {message}")]
    Config {
        provider: ProviderId,
        message: String,
    },
    /// The caller aborted the request.
    #[error("{provider} request cancelled")]
    Cancelled { provider: ProviderId },
}

impl StreamError {
    /// Creates an HTTP status error.
    pub fn http(provider: impl Into<ProviderId>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a transport-level error.
    pub fn network(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a request construction error.
    pub fn config(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Config {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            Self::MissingCredential { provider }
            | Self::Http { provider, .. }
            | Self::Network { provider, .. }
            | Self::Config { provider, .. }
            | Self::Cancelled { provider } => provider,
        }
    }

    /// Returns the HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why a decoded SSE event produced no fragments.
///
/// These never fail a request; the client logs them at debug level and keeps
/// reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkippedEvent {
    /// The event body was not valid JSON.
    #[error("malformed event ignored: {0}")]
    MalformedJson(String),
    /// The event parsed but had no `choices[0].delta`.
    #[error("unexpected payload shape ignored")]
    UnexpectedShape,
}

/// Top-level error returned by the summary orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummaryError {
    /// Invalid summarizer configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The streaming request failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl SummaryError {
    /// Returns the underlying stream error, if any.
    pub fn stream_error(&self) -> Option<&StreamError> {
        match self {
            Self::Stream(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_names_provider_status_and_upstream_text() {
        let err = StreamError::http("zhipu", 429, "rate limited");
        let text = err.to_string();
        assert!(text.contains("zhipu"));
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn summary_error_is_transparent_over_stream_error() {
        let err = SummaryError::from(StreamError::network("openai", "connection reset"));
        assert_eq!(err.to_string(), "network error (openai): connection reset");
        assert_eq!(
            err.stream_error().map(|e| e.provider_id().as_str()),
            Some("openai")
        );
    }
}
