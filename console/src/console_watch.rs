use std::sync::Arc;

use anyhow::Result;
use tokio::signal;

use lib_dashboard::{ConnectionManager, DashboardApi, QueryCache, RealtimeConfig};

mod watch_logic;
use watch_logic::{config, logger, views};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    log::info!(
        "Dashboard watcher starting (api={}, ws={})",
        config.api_base_url,
        config.ws_url
    );

    // Composition root: every component is an explicit value shared by Arc,
    // nothing lives in module-level state.
    let api = Arc::new(DashboardApi::new(&config.api_base_url)?);
    let cache = Arc::new(QueryCache::new());
    let manager = Arc::new(ConnectionManager::new(RealtimeConfig {
        url: config.ws_url.clone(),
        reconnect_delay: config.reconnect_delay,
    }));

    views::register(&manager, Arc::clone(&api), Arc::clone(&cache));

    // Warm the cache once; everything after this is notification-driven.
    match api.health().await {
        Ok(health) => log::info!(
            "Backend healthy (database_connected={})",
            health.database_connected
        ),
        Err(e) => log::warn!("Backend health check failed: {e}. Watching anyway."),
    }
    match api.projects().await {
        Ok(projects) => {
            log::info!("Watching {} projects", projects.len());
            if let Ok(value) = serde_json::to_value(&projects) {
                cache.put(views::PROJECTS_KEY, value);
            }
        }
        Err(e) => log::warn!("Initial project fetch failed: {e}"),
    }

    manager.connect();

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Stops the retry loop; leaving this out would leak an indefinite
    // reconnect task.
    manager.disconnect();

    log::info!("Shutdown complete.");
    Ok(())
}
