//! Asynchronous attachment mirror.
//!
//! Runs after a remote-provider refresh has produced a changed message
//! list. Attachment records and HTML-embedded repository links are
//! rewritten synchronously to local URIs, so served responses carry
//! local references before any bytes have landed; the byte transfers are
//! dispatched to a small fixed-size worker pool that fetches with
//! explicit connect/read timeouts and writes atomically.
//!
//! Work items are deduplicated by local target path, so two messages
//! referencing the same attachment enqueue one fetch. Failures are
//! logged and leave the file absent or stale; the next refresh cycle
//! retries (retry cadence equals refresh cadence).

mod resolve;
mod rewrite;

pub use resolve::RemoteAttachment;
pub use rewrite::rewrite_links;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use navwarn_core::Error;
use navwarn_core::model::Message;
use navwarn_core::repo::RepositoryStore;

/// Default worker pool size; deliberately small to bound load on the
/// remote origin.
const DEFAULT_WORKERS: usize = 2;

/// Attachment mirror configuration.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Connect timeout for attachment downloads (default: 5s).
    pub connect_timeout: Duration,
    /// Read timeout for attachment downloads (default: 10s).
    pub read_timeout: Duration,
    /// Worker pool size (default: 2).
    pub workers: usize,
    /// User-Agent string for download requests.
    pub user_agent: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            workers: DEFAULT_WORKERS,
            user_agent: "navwarn/0.1".to_string(),
        }
    }
}

/// Mirrors remote attachments into the local repository.
pub struct AttachmentMirror {
    http: reqwest::Client,
    permits: Arc<Semaphore>,
    repo: RepositoryStore,
}

impl AttachmentMirror {
    pub fn new(repo: RepositoryStore, config: &MirrorConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::AttachmentFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, permits: Arc::new(Semaphore::new(config.workers.max(1))), repo })
    }

    /// Rewrites attachment references in the messages to local URIs and
    /// enqueues the stale or missing files for download.
    ///
    /// Returns the number of files enqueued.
    pub fn sync_messages(
        &self,
        provider_id: &str,
        server_url: &str,
        messages: &mut [Message],
    ) -> usize {
        let t0 = Instant::now();
        let mut work: HashMap<PathBuf, RemoteAttachment> = HashMap::new();

        // First, the attachment records carried by the messages.
        for msg in messages.iter_mut() {
            let id = msg.id;
            for att in &mut msg.attachments {
                match resolve::from_attachment(&self.repo, provider_id, server_url, att) {
                    Ok(ratt) => {
                        if let Some(uri) = &ratt.local_uri {
                            att.path = uri.clone();
                        }
                        collect(&mut work, ratt);
                    }
                    Err(e) => {
                        tracing::error!(
                            "failed processing attachment for message {}: {}: {}",
                            id,
                            att.path,
                            e
                        );
                    }
                }
            }
        }

        // Next, repository links embedded in description HTML bodies.
        for msg in messages.iter_mut() {
            let id = msg.id;
            for desc in &mut msg.descs {
                let Some(html) = desc.description.as_deref() else { continue };
                let rewritten = rewrite_links(html, |value| {
                    match resolve::from_referenced_link(&self.repo, provider_id, server_url, value)
                    {
                        Ok(ratt) => {
                            let replacement =
                                ratt.local_uri.clone().unwrap_or_else(|| ratt.remote_url.clone());
                            collect(&mut work, ratt);
                            Some(replacement)
                        }
                        Err(e) => {
                            tracing::warn!(
                                "failed processing description link for message {}: {}",
                                id,
                                e
                            );
                            None
                        }
                    }
                });
                desc.description = Some(rewritten);
            }
        }

        let count = work.len();
        for ratt in work.into_values() {
            self.enqueue(ratt);
        }

        tracing::info!(
            "synchronized {} attachments, {} enqueued, in {} ms",
            provider_id,
            count,
            t0.elapsed().as_millis()
        );
        count
    }

    fn enqueue(&self, att: RemoteAttachment) {
        let http = self.http.clone();
        let permits = self.permits.clone();
        let temp_root = self.repo.temp_root();
        let repo_root = self.repo.root().to_path_buf();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire().await else {
                return;
            };
            if let Err(e) = fetch_attachment(&http, &att, &temp_root, &repo_root).await {
                tracing::error!("failed loading attachment {}: {}", att.remote_url, e);
            }
        });
    }
}

fn collect(work: &mut HashMap<PathBuf, RemoteAttachment>, ratt: RemoteAttachment) {
    if !ratt.copy_local {
        return;
    }
    let Some(path) = ratt.local_path.clone() else {
        return;
    };
    work.entry(path).or_insert(ratt);
}

/// Downloads one attachment and writes it atomically into place.
async fn fetch_attachment(
    http: &reqwest::Client,
    att: &RemoteAttachment,
    temp_root: &std::path::Path,
    repo_root: &std::path::Path,
) -> Result<(), Error> {
    let t0 = Instant::now();
    let target = att
        .local_path
        .as_deref()
        .ok_or_else(|| Error::AttachmentFetch("no local target path".to_string()))?;

    let response = http
        .get(&att.remote_url)
        .send()
        .await
        .map_err(|e| Error::AttachmentFetch(e.to_string()))?;
    if !response.status().is_success() {
        return Err(Error::AttachmentFetch(format!("status {}", response.status().as_u16())));
    }
    let bytes = response.bytes().await.map_err(|e| Error::AttachmentFetch(e.to_string()))?;

    if let Some(parent) = target.parent()
        && !parent.exists()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|e| Error::repo_io(parent, e))?;
    }

    // Write to the repository's scratch dir (same filesystem), then
    // rename into place so readers never observe a partial file.
    let temp_name = target
        .strip_prefix(repo_root)
        .unwrap_or(target)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_");
    let temp_path = temp_root.join(format!("{temp_name}.part"));

    tokio::fs::write(&temp_path, &bytes).await.map_err(|e| Error::repo_io(&temp_path, e))?;
    tokio::fs::rename(&temp_path, target).await.map_err(|e| Error::repo_io(target, e))?;

    tracing::info!(
        "copied {} -> {} in {} ms",
        att.remote_url,
        target.display(),
        t0.elapsed().as_millis()
    );
    Ok(())
}
