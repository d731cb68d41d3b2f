//! Response and request models for the dashboard REST API.
//!
//! Field names mirror the backend's JSON exactly; do not rename without a
//! backend change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registered source project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: i64,
    pub name: String,
    pub root_path: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-project analysis counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub project_id: i64,
    pub total_files: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub java_files: u64,
    pub jsp_files: u64,
    pub xml_files: u64,
    pub total_classes: u64,
    pub total_methods: u64,
    pub total_sql_units: u64,
}

/// One bucket of the confidence error distribution (excellent/good/...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBucket {
    pub count: u64,
    pub percentage: f64,
}

/// Confidence validation report against the ground-truth set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub mean_absolute_error: f64,
    pub median_absolute_error: f64,
    #[serde(default)]
    pub error_distribution: HashMap<String, ErrorBucket>,
    pub total_validations: u64,
}

/// Outcome of a calibration run over the confidence formula weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    #[serde(default)]
    pub current_weights: HashMap<String, f64>,
    pub current_mae: f64,
    #[serde(default)]
    pub best_weights: HashMap<String, f64>,
    pub best_mae: f64,
    pub improvement: f64,
    pub improvement_percentage: f64,
    pub calibration_attempts: u64,
    pub recommendation: String,
}

/// A manually verified expectation for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    pub file_path: String,
    pub parser_type: String,
    pub expected_confidence: f64,
    #[serde(default)]
    pub expected_classes: u64,
    #[serde(default)]
    pub expected_methods: u64,
    #[serde(default)]
    pub expected_sql_units: u64,
    #[serde(default)]
    pub verified_tables: Vec<String>,
    #[serde(default)]
    pub complexity_factors: HashMap<String, Value>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_verifier")]
    pub verifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<String>,
}

fn default_verifier() -> String {
    "web_user".to_string()
}

/// Request body for starting an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub project_path: String,
    pub project_name: String,
    #[serde(default)]
    pub incremental: bool,
}

/// Acknowledgement returned when an analysis run is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStarted {
    pub message: String,
    pub project_path: String,
    pub project_name: String,
}

/// Plain acknowledgement body (`{"message": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
}

/// Backend health probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub database_connected: bool,
}
