//! Resolution of remote attachments and referenced files.
//!
//! Attachment paths and embedded links received from a remote server
//! point into that server's repository. Each recognized reference is
//! resolved to a local target path (via the hashed repository scheme), a
//! local-facing URI to substitute into the message, the fully-qualified
//! remote URL, and a "needs copy" flag.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use navwarn_core::model::Attachment;
use navwarn_core::repo::{RepositoryStore, encode_uri};
use navwarn_core::Error;

/// Attachment paths inside the remote message repository:
/// `messages/{d}/{dd}/{id}/{file}`.
static REMOTE_ATTACHMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?messages/\d+/\d+/(?P<id>\d+)/(?P<file>.+)$").expect("invalid pattern")
});

/// Served repository links on the remote server:
/// `/rest/repo/file/messages/{d}/{dd}/{id}/{file}`.
static REMOTE_REPO_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?rest/repo/file/messages/\d+/\d+/(?P<id>\d+)/(?P<file>.+)$")
        .expect("invalid pattern")
});

/// Path under which the remote server streams repository files.
const REMOTE_REPO_FILE_PATH: &str = "/rest/repo/file/";

/// A remote file resolved against the local repository.
#[derive(Debug, Clone)]
pub struct RemoteAttachment {
    /// Local target path; `None` when the reference does not point into
    /// the remote repository.
    pub local_path: Option<PathBuf>,
    /// Local-facing URI substituted into the message, when mirrored.
    pub local_uri: Option<String>,
    /// Fully-qualified URL of the original file on the remote server.
    pub remote_url: String,
    /// Whether the file must be copied to the local repository.
    pub copy_local: bool,
}

impl RemoteAttachment {
    fn pass_through(remote_url: String) -> Self {
        Self { local_path: None, local_uri: None, remote_url, copy_local: false }
    }
}

/// Resolves an attachment record received from the remote server.
///
/// The local copy is stale when it is absent or older than the remote
/// `updated` timestamp carried by the attachment.
pub fn from_attachment(
    repo: &RepositoryStore,
    provider_id: &str,
    server_url: &str,
    att: &Attachment,
) -> Result<RemoteAttachment, Error> {
    let id: i64 = match REMOTE_ATTACHMENT_PATTERN.captures(&att.path) {
        Some(caps) => match caps["id"].parse() {
            Ok(id) => id,
            // Not a repository attachment; keep it remote.
            Err(_) => return Ok(RemoteAttachment::pass_through(absolute_url(server_url, &att.path))),
        },
        None => return Ok(RemoteAttachment::pass_through(absolute_url(server_url, &att.path))),
    };

    let local_path = repo.message_file(provider_id, id, &att.name, false)?;
    let local_uri =
        encode_uri(&format!("{}/{}", repo.message_folder_path(provider_id, id)?, att.name));
    let remote_url = concat_url(&[server_url, REMOTE_REPO_FILE_PATH, &att.path]);

    // Copy when absent, or when the remote updated timestamp is newer
    // than the local file's modification time.
    let copy_local = match local_modified_millis(&local_path) {
        None => true,
        Some(modified) => {
            att.updated.map(|u| modified < u.timestamp_millis()).unwrap_or(false)
        }
    };

    Ok(RemoteAttachment {
        local_path: Some(local_path),
        local_uri: Some(local_uri),
        remote_url,
        copy_local,
    })
}

/// Resolves an `href`/`src` link embedded in a description HTML body.
///
/// Bare links carry no remote timestamp, so "needs copy" is simply
/// "absent locally".
pub fn from_referenced_link(
    repo: &RepositoryStore,
    provider_id: &str,
    server_url: &str,
    path: &str,
) -> Result<RemoteAttachment, Error> {
    let Some(caps) = REMOTE_REPO_FILE_PATTERN.captures(path) else {
        return Ok(RemoteAttachment::pass_through(absolute_url(server_url, path)));
    };
    let Ok(id) = caps["id"].parse::<i64>() else {
        return Ok(RemoteAttachment::pass_through(absolute_url(server_url, path)));
    };
    // The file path in a served link is URL-encoded.
    let file = urlencoding::decode(&caps["file"])
        .map(|f| f.into_owned())
        .unwrap_or_else(|_| caps["file"].to_string());

    let local_path = repo.message_file(provider_id, id, &file, false)?;
    let local_uri = repo.message_file_uri(provider_id, id, &file)?;
    let remote_url = concat_url(&[server_url, path]);
    let copy_local = local_modified_millis(&local_path).is_none();

    Ok(RemoteAttachment {
        local_path: Some(local_path),
        local_uri: Some(local_uri),
        remote_url,
        copy_local,
    })
}

fn local_modified_millis(path: &std::path::Path) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as i64)
}

fn absolute_url(server_url: &str, path: &str) -> String {
    if path.to_lowercase().starts_with("http") {
        path.to_string()
    } else {
        concat_url(&[server_url, path])
    }
}

/// Joins URL parts with exactly one `/` between them.
fn concat_url(parts: &[&str]) -> String {
    let mut url = String::new();
    for part in parts {
        if !part.starts_with('/') && !url.is_empty() && !url.ends_with('/') {
            url.push('/');
        }
        if url.ends_with('/') && part.starts_with('/') {
            url.pop();
        }
        url.push_str(part);
    }
    url
}
