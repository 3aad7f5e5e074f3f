//! Repository reachability scan and orphan sweep.
//!
//! A message's repository folder stays reachable while any current
//! message references it: by its own id, by an attachment path, or by an
//! `href`/`src` link embedded in a description's HTML body. The latter
//! catches attachments no longer carried in the attachment list but
//! still hot-linked from free text.
//!
//! The sweep is mark-and-sweep over the provider's repository subtree,
//! run on the cleanup timer, never on the read/write path. Per-entry
//! delete failures are logged and skipped.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::model::{Localized, Message};
use crate::repo::{MESSAGE_REPO_ROOT, RepositoryStore};

/// Attachment paths inside a message repository:
/// `messages/{provider}/{h}/{hh}/{id}/{file}`.
pub static ATTACHMENT_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?messages/\w+/\w+/\w+/(?P<id>\d+)/.+$").expect("invalid pattern")
});

/// Served repository links inside HTML bodies:
/// `/repo/file/messages/{provider}/{h}/{hh}/{id}/{file}`.
pub static REPO_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?repo/file/messages/\w+/\w+/\w+/(?P<id>\d+)/.+$").expect("invalid pattern")
});

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub files_deleted: usize,
    pub dirs_deleted: usize,
    pub failures: usize,
}

/// Computes the message ids still referenced by the given list.
///
/// Includes every message id, every id parsed out of attachment paths,
/// and every id parsed out of `href`/`src` attributes in description
/// HTML bodies.
pub fn referenced_message_ids(messages: &[Message]) -> BTreeSet<i64> {
    let mut ids = BTreeSet::new();

    for msg in messages {
        ids.insert(msg.id);

        for att in &msg.attachments {
            if let Some(caps) = ATTACHMENT_FILE_PATTERN.captures(&att.path)
                && let Ok(id) = caps["id"].parse()
            {
                ids.insert(id);
            }
        }

        for desc in msg.descs() {
            if let Some(html) = desc.description.as_deref()
                && !html.trim().is_empty()
            {
                collect_html_ids(&mut ids, html);
            }
        }
    }

    ids
}

fn collect_html_ids(ids: &mut BTreeSet<i64>, html: &str) {
    let doc = Html::parse_fragment(html);
    let href = Selector::parse("a[href]").expect("invalid selector");
    let src = Selector::parse("img[src]").expect("invalid selector");
    let attrs = doc
        .select(&href)
        .filter_map(|e| e.value().attr("href"))
        .chain(doc.select(&src).filter_map(|e| e.value().attr("src")));

    for value in attrs {
        if let Some(caps) = REPO_FILE_PATTERN.captures(value)
            && let Ok(id) = caps["id"].parse()
        {
            ids.insert(id);
        }
    }
}

/// Deletes repository content no longer referenced by the current
/// message list of a provider.
pub struct ReachabilityScanner {
    repo: RepositoryStore,
}

impl ReachabilityScanner {
    pub fn new(repo: RepositoryStore) -> Self {
        Self { repo }
    }

    /// Runs one mark-and-sweep pass over the provider's repo subtree.
    pub fn clean(&self, provider_id: &str, messages: &[Message]) -> CleanupStats {
        let ids = referenced_message_ids(messages);

        // Retain each reachable message folder and its hash fan-out
        // ancestors, plus the provider root itself.
        let mut retained: HashSet<PathBuf> = HashSet::new();
        for id in &ids {
            match self.repo.message_folder(provider_id, *id, false) {
                Ok(folder) => {
                    if let Some(parent) = folder.parent() {
                        retained.insert(parent.to_path_buf());
                        if let Some(grandparent) = parent.parent() {
                            retained.insert(grandparent.to_path_buf());
                        }
                    }
                    retained.insert(folder);
                }
                Err(e) => {
                    tracing::error!(
                        "failed computing {} repo path for message {}: {}",
                        provider_id,
                        id,
                        e
                    );
                }
            }
        }

        let provider_root = self.repo.root().join(MESSAGE_REPO_ROOT).join(provider_id);
        retained.insert(provider_root.clone());

        let mut stats = CleanupStats::default();
        if provider_root.is_dir() {
            sweep(&provider_root, &retained, &mut stats);
        }

        tracing::info!(
            "cleaned up {} message repo: {} files, {} dirs deleted, {} failures",
            provider_id,
            stats.files_deleted,
            stats.dirs_deleted,
            stats.failures
        );
        stats
    }
}

/// Post-order sweep: files with an unretained parent folder are deleted,
/// unretained directories are deleted once empty.
fn sweep(dir: &Path, retained: &HashSet<PathBuf>, stats: &mut CleanupStats) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("failed reading repo directory {}: {}", dir.display(), e);
            stats.failures += 1;
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            sweep(&path, retained, stats);
            if !retained.contains(&path) {
                match fs::remove_dir(&path) {
                    Ok(()) => {
                        tracing::info!("deleting message repo directory: {}", path.display());
                        stats.dirs_deleted += 1;
                    }
                    Err(e) => {
                        tracing::error!("failed deleting {}: {}", path.display(), e);
                        stats.failures += 1;
                    }
                }
            }
        } else if !retained.contains(dir) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("deleting message repo file: {}", path.display());
                    stats.files_deleted += 1;
                }
                Err(e) => {
                    tracing::error!("failed deleting {}: {}", path.display(), e);
                    stats.failures += 1;
                }
            }
        }
    }
}
