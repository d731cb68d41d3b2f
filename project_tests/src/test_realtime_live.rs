//! # Notification Channel Live Watcher
//!
//! Connects the real WebSocket manager to a running backend and prints every
//! envelope it routes for sixty seconds. Kill and restart the backend while
//! this runs to watch the fixed-interval reconnect behavior.
//!
//! Usage: `cargo run --bin test_realtime_live [-- <ws_url>]`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lib_dashboard::realtime::kinds;
use lib_dashboard::{ConnectionManager, LinkState, RealtimeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:8000/ws".to_string());

    let manager = Arc::new(ConnectionManager::new(RealtimeConfig {
        url: url.clone(),
        reconnect_delay: Duration::from_secs(3),
    }));

    let received = Arc::new(AtomicUsize::new(0));
    for kind in [
        kinds::ANALYSIS_STARTED,
        kinds::ANALYSIS_PROGRESS,
        kinds::GROUND_TRUTH_ADDED,
        kinds::CONFIDENCE_CALIBRATED,
    ] {
        let counter = Arc::clone(&received);
        let kind_name = kind.to_string();
        manager.on(kind, move |payload| {
            counter.fetch_add(1, Ordering::Relaxed);
            println!("📨 {kind_name}: {payload}");
        });
    }

    println!("Watching {url} for 60 seconds...");
    manager.connect();

    for _ in 0..12 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        println!(
            "state={:?}, envelopes received={}",
            manager.state(),
            received.load(Ordering::Relaxed)
        );
    }

    manager.disconnect();
    assert_eq!(manager.state(), LinkState::Closed);
    println!("Done. {} envelopes total.", received.load(Ordering::Relaxed));
    Ok(())
}
