//! navwarnd entry point.
//!
//! Boots the aggregation engine: loads configuration, constructs the
//! repository, cache and provider registry, runs the initial message
//! loads, and schedules the periodic refresh and cleanup tasks until
//! shutdown.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = navwarn_core::AppConfig::load()?;
    tracing::info!("starting navwarnd with repository at {}", config.repo_root.display());

    let app = app::App::build(config)?;
    tracing::info!(
        "repository ready at {}, {} provider(s) registered",
        app.repo.root().display(),
        app.registry.stores().len()
    );

    // Initial loads, so the first readers see data without waiting for
    // the first timer tick.
    for store in app.registry.stores() {
        if let Err(e) = store.load_messages().await {
            tracing::error!("initial load of {} failed: {}", store.provider_id(), e);
        }
    }

    let mut tasks = Vec::new();
    for store in app.registry.stores() {
        tasks.push(scheduler::spawn_refresh(store.clone(), app.config.refresh_interval()));
        tasks.push(scheduler::spawn_cleanup(
            store.clone(),
            app.scanner.clone(),
            app.config.cleanup_interval(),
        ));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    for task in tasks {
        task.abort();
    }

    Ok(())
}
