//! Unified error types for navwarn.
//!
//! Refresh and cleanup failures are contained at the provider boundary:
//! readers are always served the prior snapshot instead of an error.

use std::path::PathBuf;

/// Unified error types for the navwarn core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream source unreachable (network or database down).
    /// The prior message list remains authoritative; retried next cycle.
    #[error("SOURCE_UNAVAILABLE: {0}")]
    SourceUnavailable(String),

    /// Upstream data could not be mapped to the message model.
    /// Indicates a contract break with the upstream.
    #[error("SOURCE_FORMAT: {0}")]
    SourceFormat(String),

    /// A single attachment could not be fetched or written locally.
    /// Never fatal to the refresh; retried on the next mirror pass.
    #[error("ATTACHMENT_FETCH: {0}")]
    AttachmentFetch(String),

    /// Repository I/O failure (disk full, permissions, missing path).
    #[error("REPOSITORY_IO: {}: {source}", path.display())]
    RepositoryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No provider registered under the given id.
    #[error("UNKNOWN_PROVIDER: {0}")]
    UnknownProvider(String),

    /// Malformed filter criteria supplied by a caller.
    #[error("INVALID_CRITERIA: {0}")]
    InvalidCriteria(String),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn repo_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::RepositoryIo { path: path.into(), source }
    }
}
