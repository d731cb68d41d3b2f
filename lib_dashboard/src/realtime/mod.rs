//! Realtime notification channel.
//!
//! The backend broadcasts small JSON envelopes (`{"type": ..., "data": ...}`)
//! over a single WebSocket endpoint whenever a long-running analysis job makes
//! progress. This module keeps one logical connection to that endpoint alive
//! across transient failures and routes incoming envelopes to handlers that
//! views register per event kind.

pub mod envelope;
pub mod manager;
pub mod transport;

/// Event kinds broadcast by the backend.
///
/// The payload schema is defined by the backend per kind; consumers typically
/// only pull an id out of it and refetch the rest over REST.
pub mod kinds {
    /// A new analysis run was accepted (`data` carries the project path/name).
    pub const ANALYSIS_STARTED: &str = "analysis_started";
    /// A running analysis advanced (`data` carries at least `project_id`).
    pub const ANALYSIS_PROGRESS: &str = "analysis_progress";
    /// A ground-truth record was added through the dashboard.
    pub const GROUND_TRUTH_ADDED: &str = "ground_truth_added";
    /// Confidence weights were recalibrated and applied.
    pub const CONFIDENCE_CALIBRATED: &str = "confidence_calibrated";
}
