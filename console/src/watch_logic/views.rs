//! Consumer glue between the notification channel and the REST layer.
//!
//! Each registered handler does the same two-step dance a dashboard view
//! would: mark the affected cache keys stale, then refetch through the REST
//! client in a spawned task. The channel itself never carries full payloads,
//! only enough to know what went stale.

use std::sync::Arc;

use serde_json::Value;

use lib_dashboard::realtime::kinds;
use lib_dashboard::{ConnectionManager, DashboardApi, QueryCache};

pub const PROJECTS_KEY: &str = "projects";
pub const GROUND_TRUTH_KEY: &str = "ground-truth";
pub const CONFIDENCE_REPORT_KEY: &str = "confidence-report";

pub fn analysis_key(project_id: i64) -> String {
    format!("analysis:{project_id}")
}

/// Registers a handler for every event kind the backend broadcasts.
///
/// Handlers are synchronous; the actual refetch happens in a spawned task so
/// dispatch of subsequent envelopes is never held up by a slow backend.
pub fn register(manager: &ConnectionManager, api: Arc<DashboardApi>, cache: Arc<QueryCache>) {
    on_analysis_started(manager, Arc::clone(&api), Arc::clone(&cache));
    on_analysis_progress(manager, Arc::clone(&api), Arc::clone(&cache));
    on_ground_truth_added(manager, Arc::clone(&api), Arc::clone(&cache));
    on_confidence_calibrated(manager, api, cache);
}

fn on_analysis_started(manager: &ConnectionManager, api: Arc<DashboardApi>, cache: Arc<QueryCache>) {
    manager.on(kinds::ANALYSIS_STARTED, move |payload| {
        let name = payload
            .get("project_name")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");
        log::info!("Analysis started for '{name}'; refreshing project list");

        cache.invalidate(PROJECTS_KEY);
        cache.invalidate_prefix("analysis:");

        let api = Arc::clone(&api);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            match api.projects().await {
                Ok(projects) => {
                    log::info!("Project list refreshed: {} projects", projects.len());
                    if let Ok(value) = serde_json::to_value(&projects) {
                        cache.put(PROJECTS_KEY, value);
                    }
                }
                Err(e) => log::warn!("Project list refetch failed: {e}"),
            }
        });
    });
}

fn on_analysis_progress(manager: &ConnectionManager, api: Arc<DashboardApi>, cache: Arc<QueryCache>) {
    manager.on(kinds::ANALYSIS_PROGRESS, move |payload| {
        let Some(project_id) = payload.get("project_id").and_then(Value::as_i64) else {
            log::warn!("analysis_progress payload without project_id: {payload}");
            return;
        };

        let key = analysis_key(project_id);
        cache.invalidate(&key);

        let api = Arc::clone(&api);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            match api.project_analysis(project_id).await {
                Ok(summary) => {
                    log::info!(
                        "Project {} analysis refreshed: {} files, {} classes, {} SQL units",
                        project_id,
                        summary.total_files,
                        summary.total_classes,
                        summary.total_sql_units
                    );
                    if let Ok(value) = serde_json::to_value(&summary) {
                        cache.put(&key, value);
                    }
                }
                Err(e) => log::warn!("Analysis refetch for project {project_id} failed: {e}"),
            }
        });
    });
}

fn on_ground_truth_added(manager: &ConnectionManager, api: Arc<DashboardApi>, cache: Arc<QueryCache>) {
    manager.on(kinds::GROUND_TRUTH_ADDED, move |payload| {
        let file_path = payload
            .get("file_path")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");
        log::info!("Ground truth added for {file_path}");

        cache.invalidate(GROUND_TRUTH_KEY);
        // New ground truth changes the validation baseline too.
        cache.invalidate(CONFIDENCE_REPORT_KEY);

        let api = Arc::clone(&api);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            match api.ground_truth().await {
                Ok(entries) => {
                    log::info!("Ground truth refreshed: {} entries", entries.len());
                    if let Ok(value) = serde_json::to_value(&entries) {
                        cache.put(GROUND_TRUTH_KEY, value);
                    }
                }
                Err(e) => log::warn!("Ground truth refetch failed: {e}"),
            }
        });
    });
}

fn on_confidence_calibrated(
    manager: &ConnectionManager,
    api: Arc<DashboardApi>,
    cache: Arc<QueryCache>,
) {
    manager.on(kinds::CONFIDENCE_CALIBRATED, move |payload| {
        let improvement = payload
            .get("improvement_percentage")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        log::info!("Confidence weights recalibrated ({improvement:.2}% improvement)");

        cache.invalidate(CONFIDENCE_REPORT_KEY);

        let api = Arc::clone(&api);
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            match api.confidence_report().await {
                Ok(report) => {
                    log::info!(
                        "Confidence report refreshed: MAE {:.4} over {} validations",
                        report.mean_absolute_error,
                        report.total_validations
                    );
                    if let Ok(value) = serde_json::to_value(&report) {
                        cache.put(CONFIDENCE_REPORT_KEY, value);
                    }
                }
                Err(e) => log::warn!("Confidence report refetch failed: {e}"),
            }
        });
    });
}
