//! Periodic background tasks.
//!
//! One refresh task and one cleanup task per provider, on independent
//! timers. Reads never wait on these: a refresh swaps the snapshot
//! reference, and cleanup re-reads the current snapshot at its own
//! scheduled time.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use navwarn_core::scan::ReachabilityScanner;
use navwarn_core::store::MessageStore;

/// Spawns the periodic refresh task for a provider store.
pub fn spawn_refresh(store: Arc<MessageStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the initial load already
        // happened at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = store.load_messages().await {
                tracing::error!("failed loading {} messages: {}", store.provider_id(), e);
            }
        }
    })
}

/// Spawns the periodic repository cleanup task for a provider store.
pub fn spawn_cleanup(
    store: Arc<MessageStore>,
    scanner: Arc<ReachabilityScanner>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; cleanup can wait a full
        // interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let provider_id = store.provider_id().to_string();
            let messages = store.active_messages();
            let scanner = scanner.clone();

            // The sweep is blocking filesystem work.
            let result = tokio::task::spawn_blocking(move || {
                scanner.clean(&provider_id, &messages)
            })
            .await;

            if let Err(e) = result {
                tracing::error!("cleanup task for {} panicked: {}", store.provider_id(), e);
            }
        }
    })
}
