//! Process-wide application state.
//!
//! Everything is explicitly constructed at process start — repository,
//! cache, mirror, providers, registry — and dropped at process stop.
//! The registry plus the repository form the facade the transport layer
//! consumes.

use std::sync::Arc;

use anyhow::{Context, Result};

use navwarn_client::mirror::{AttachmentMirror, MirrorConfig};
use navwarn_client::remote::{RemoteProvider, RemoteProviderConfig};
use navwarn_core::scan::ReachabilityScanner;
use navwarn_core::{AppConfig, MessageCache, MessageStore, ProviderRegistry, RepositoryStore};

pub struct App {
    pub config: AppConfig,
    pub repo: RepositoryStore,
    pub registry: Arc<ProviderRegistry>,
    pub scanner: Arc<ReachabilityScanner>,
}

impl App {
    /// Builds the application from configuration.
    ///
    /// Registers the remote provider when a remote URL is configured.
    /// Additional providers (e.g. a legacy database adapter) are
    /// registered here as they are wired up.
    pub fn build(config: AppConfig) -> Result<Self> {
        let repo = RepositoryStore::open(&config.repo_root)
            .with_context(|| format!("opening repository at {}", config.repo_root.display()))?;
        let cache = Arc::new(MessageCache::new(config.cache_max_entries, config.cache_ttl()));
        let scanner = Arc::new(ReachabilityScanner::new(repo.clone()));

        let mut registry = ProviderRegistry::new();

        if let Some(remote_url) = &config.remote_url {
            let mirror_config = MirrorConfig {
                connect_timeout: config.connect_timeout(),
                read_timeout: config.read_timeout(),
                workers: config.mirror_workers,
                user_agent: config.user_agent.clone(),
            };
            let mirror = Arc::new(
                AttachmentMirror::new(repo.clone(), &mirror_config)
                    .context("building attachment mirror")?,
            );

            let provider_config = RemoteProviderConfig {
                server_url: remote_url.clone(),
                connect_timeout: config.connect_timeout(),
                read_timeout: config.read_timeout(),
                user_agent: config.user_agent.clone(),
            };
            let provider = Arc::new(
                RemoteProvider::new(provider_config, mirror)
                    .context("building remote provider")?,
            );
            registry.register(Arc::new(MessageStore::new(provider, cache.clone())));
        }

        if registry.stores().is_empty() {
            tracing::warn!("no providers configured; set NAVWARN_REMOTE_URL");
        }

        Ok(Self { config, repo, registry: Arc::new(registry), scanner })
    }
}
