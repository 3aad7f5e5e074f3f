//! File attachments carried by messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file reference carried by a message or returned by a repository
/// folder listing.
///
/// `path` is repository-relative and URL-encoded; for messages loaded
/// from a remote provider it initially points into the remote repository
/// and is rewritten to the local copy by the attachment mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub directory: bool,
}

impl Attachment {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), ..Default::default() }
    }
}
