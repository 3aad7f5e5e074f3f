//! Remote message server client error types.

use std::sync::Arc;

use navwarn_core::Error;

/// Errors from the remote message server client.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { RemoteError::Timeout } else { RemoteError::Network(Arc::new(err)) }
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Parse(msg) => Error::SourceFormat(msg),
            other => Error::SourceUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_maps_to_source_format() {
        let err: Error = RemoteError::Parse("bad json".to_string()).into();
        assert!(matches!(err, Error::SourceFormat(_)));
    }

    #[test]
    fn test_http_error_maps_to_source_unavailable() {
        let err: Error = RemoteError::Http { status: 502 }.into();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }
}
