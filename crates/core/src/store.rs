//! Per-provider message store with change detection.
//!
//! The live message list is an atomically-swapped immutable snapshot:
//! readers clone an `Arc` under a briefly-held lock and then observe a
//! consistent, unchanging list even while a refresh is in progress.
//! Cache invalidation happens only on genuine content change, never on a
//! wasted refresh cycle — that is the load-side half of the caching
//! contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::cache::{CachedMessages, MessageCache};
use crate::error::Error;
use crate::filter::MessageFilter;
use crate::model::Message;

/// Cheap change-detection projection of one message: `(id, updated)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub id: i64,
    pub updated: DateTime<Utc>,
}

impl Watermark {
    pub fn new(id: i64, updated: DateTime<Utc>) -> Self {
        Self { id, updated }
    }

    pub fn of(msg: &Message) -> Self {
        Self { id: msg.id, updated: msg.updated }
    }
}

/// An upstream source of messages.
///
/// Implementations own the raw pull and the mapping to the shared model;
/// the store owns change detection, snapshot swapping and cache
/// invalidation.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    /// Unique id of this provider.
    fn provider_id(&self) -> &str;

    /// Priority among providers; the highest becomes the default.
    fn priority(&self) -> i32;

    /// Supported language codes, in prioritized order.
    fn languages(&self) -> &[&str];

    /// The given language if supported, otherwise the provider's first.
    fn language<'a>(&'a self, lang: Option<&'a str>) -> &'a str {
        lang.and_then(|l| {
            self.languages().iter().find(|supported| supported.eq_ignore_ascii_case(l)).copied()
        })
        .unwrap_or(self.languages()[0])
    }

    /// Cheap ordered `(id, updated)` projection of the upstream data.
    ///
    /// Providers where a full load is expensive (database sources)
    /// return `Some` so an unchanged projection skips materialization
    /// entirely. The upstream query must return rows in a stable order;
    /// ordering drift without content drift counts as a change.
    async fn watermarks(&self) -> Result<Option<Vec<Watermark>>, Error> {
        Ok(None)
    }

    /// Pulls the upstream data and maps it to the shared model.
    async fn load(&self) -> Result<Vec<Message>, Error>;

    /// Invoked after change detection and before the new list is
    /// published. Remote providers rewrite attachment references and
    /// enqueue mirror fetches here; failures must be contained.
    async fn prepare(&self, _messages: &mut [Message]) {}
}

/// Holds a provider's current message list and serves filtered, cached
/// views of it.
pub struct MessageStore {
    provider: Arc<dyn MessageProvider>,
    cache: Arc<MessageCache>,
    messages: RwLock<CachedMessages>,
    watermarks: RwLock<Arc<Vec<Watermark>>>,
    /// Epoch millis of the last published change; -1 before the first.
    fetch_time: AtomicI64,
}

impl MessageStore {
    pub fn new(provider: Arc<dyn MessageProvider>, cache: Arc<MessageCache>) -> Self {
        Self {
            provider,
            cache,
            messages: RwLock::new(Arc::new(Vec::new())),
            watermarks: RwLock::new(Arc::new(Vec::new())),
            fetch_time: AtomicI64::new(-1),
        }
    }

    pub fn provider(&self) -> &Arc<dyn MessageProvider> {
        &self.provider
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    /// The current snapshot of active messages.
    pub fn active_messages(&self) -> CachedMessages {
        self.messages.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The message with the given id, if present.
    pub fn message(&self, id: i64) -> Option<Message> {
        self.active_messages().iter().find(|msg| msg.id == id).cloned()
    }

    /// The key under which views for the given filter are cached.
    ///
    /// Embeds the fetch timestamp, so a content change makes stale keys
    /// unreachable even before the bucket clear; the explicit clear on
    /// change bounds memory, not correctness.
    pub fn cache_key(&self, filter: &MessageFilter) -> String {
        format!(
            "{}_{}_{}",
            self.provider_id(),
            self.fetch_time.load(Ordering::Acquire),
            filter.key()
        )
    }

    /// Deterministic fingerprint of a served view, used verbatim as an
    /// HTTP strong validator.
    pub fn etag_token(&self, format: &str, filter: &MessageFilter, messages: &[Message]) -> String {
        let mut content = String::new();
        for msg in messages {
            content.push_str(&msg.id.to_string());
            content.push_str(&msg.updated.timestamp_millis().to_string());
        }

        let mut hasher = Sha256::new();
        hasher.update(format.as_bytes());
        hasher.update(b"_");
        hasher.update(content.as_bytes());
        hasher.update(b"_");
        hasher.update(self.cache_key(filter).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// A filtered view of the current snapshot.
    ///
    /// An empty filter returns the live list itself — no copy, no cache.
    /// Otherwise the view is served from the provider's cache bucket,
    /// computed on miss.
    pub fn cached_messages(&self, filter: &MessageFilter) -> CachedMessages {
        if filter.is_empty() {
            return self.active_messages();
        }

        let key = self.cache_key(filter);
        if let Some(hit) = self.cache.get(self.provider_id(), &key) {
            return hit;
        }

        let result: CachedMessages = Arc::new(filter.filter(&self.active_messages()));
        self.cache.put(self.provider_id(), key, result.clone());
        result
    }

    /// Refreshes the message list from the provider.
    ///
    /// Unchanged upstream data is a no-op returning the existing
    /// snapshot: no cache clear, no fetch-timestamp bump. On genuine
    /// change the new list is prepared, published atomically, and the
    /// provider's cache bucket cleared.
    pub async fn load_messages(&self) -> Result<CachedMessages, Error> {
        let t0 = Instant::now();

        let projection = self.provider.watermarks().await?;
        if let Some(wm) = &projection
            && self.unchanged(wm)
        {
            tracing::trace!("{} messages not changed", self.provider_id());
            return Ok(self.active_messages());
        }

        let mut messages = self.provider.load().await?;

        let watermarks = match projection {
            Some(wm) => wm,
            None => {
                let wm: Vec<Watermark> = messages.iter().map(Watermark::of).collect();
                if self.unchanged(&wm) {
                    tracing::trace!("{} messages not changed", self.provider_id());
                    return Ok(self.active_messages());
                }
                wm
            }
        };

        self.check_watermark_regressions(&messages);
        self.provider.prepare(&mut messages).await;

        let count = messages.len();
        let snapshot = self.publish(messages, watermarks);
        tracing::info!(
            "loaded {} {} messages in {} ms",
            count,
            self.provider_id(),
            t0.elapsed().as_millis()
        );
        Ok(snapshot)
    }

    fn unchanged(&self, watermarks: &[Watermark]) -> bool {
        let current = self.watermarks.read().unwrap_or_else(PoisonError::into_inner);
        *watermarks == **current
    }

    /// An `updated` regression is a provider data-integrity anomaly; it
    /// is logged, not filtered out.
    fn check_watermark_regressions(&self, messages: &[Message]) {
        let current = self.messages.read().unwrap_or_else(PoisonError::into_inner).clone();
        let previous: HashMap<i64, DateTime<Utc>> =
            current.iter().map(|msg| (msg.id, msg.updated)).collect();

        for msg in messages {
            if let Some(prev) = previous.get(&msg.id)
                && msg.updated < *prev
            {
                tracing::warn!(
                    "{} message {} updated regressed from {} to {}",
                    self.provider_id(),
                    msg.id,
                    prev,
                    msg.updated
                );
            }
        }
    }

    /// Atomically swaps in the new list, stamps the provider tag, bumps
    /// the fetch timestamp and clears the cache bucket.
    fn publish(&self, mut messages: Vec<Message>, watermarks: Vec<Watermark>) -> CachedMessages {
        let provider_id = self.provider_id().to_string();
        for msg in &mut messages {
            msg.provider = Some(provider_id.clone());
        }

        let snapshot: CachedMessages = Arc::new(messages);
        *self.messages.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        *self.watermarks.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(watermarks);

        // Strictly advancing, so two publishes within one millisecond
        // still produce distinct cache keys.
        let prev = self.fetch_time.load(Ordering::Acquire);
        self.fetch_time.store(Utc::now().timestamp_millis().max(prev + 1), Ordering::Release);

        self.cache.clear(self.provider_id());
        snapshot
    }
}
