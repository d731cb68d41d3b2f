//! # `DashboardApi` Live Integration Checks
//!
//! Standalone runner that exercises the REST client against a running
//! dashboard backend (default `http://localhost:8000/api/`). It walks the
//! read-only endpoints and prints what it finds; it is meant for manual runs
//! while the backend is up, not for CI.
//!
//! Usage: `cargo run --bin test_api_client [-- <base_url>]`

use lib_dashboard::DashboardApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000/api/".to_string());
    let api = DashboardApi::new(&base_url)?;

    println!("--- Dashboard API checks against {base_url} ---");

    // 1. Health probe: must respond before anything else is worth testing.
    let health = api.health().await?;
    println!(
        "✅ Health: status={}, database_connected={}",
        health.status, health.database_connected
    );
    assert_eq!(health.status, "healthy");

    // 2. Project listing and per-project analysis summaries.
    let projects = api.projects().await?;
    println!("✅ Projects: {} registered", projects.len());

    for project in &projects {
        let summary = api.project_analysis(project.project_id).await?;
        assert_eq!(summary.project_id, project.project_id);
        println!(
            "   - '{}': {} files ({} java / {} jsp / {} xml), {} classes, {} methods, {} SQL units",
            project.name,
            summary.total_files,
            summary.java_files,
            summary.jsp_files,
            summary.xml_files,
            summary.total_classes,
            summary.total_methods,
            summary.total_sql_units,
        );
    }

    // 3. Ground-truth listing.
    let entries = api.ground_truth().await?;
    println!("✅ Ground truth: {} entries", entries.len());

    // 4. Confidence report. The backend returns 400 when no validations exist
    //    yet, which is a legitimate state for a fresh database.
    match api.confidence_report().await {
        Ok(report) => println!(
            "✅ Confidence report: MAE {:.4} over {} validations",
            report.mean_absolute_error, report.total_validations
        ),
        Err(e) => println!("ℹ️ Confidence report unavailable: {e}"),
    }

    println!("--- All API checks passed ---");
    Ok(())
}
