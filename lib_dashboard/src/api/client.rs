//! # Dashboard REST Client
//!
//! Asynchronous client for the backend's `/api` routes, built on
//! `reqwest_middleware` with exponential-backoff retries for transient
//! transport failures. Non-2xx responses become a typed [`ApiError`] carrying
//! the status and raw body; they are never panics.

use reqwest::{Method, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

use crate::api::models::{
    Acknowledgement, AnalysisRequest, AnalysisStarted, AnalysisSummary, CalibrationResult,
    ConfidenceReport, GroundTruthEntry, HealthStatus, ProjectInfo,
};

/// Errors surfaced by the REST client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL '{0}'")]
    BaseUrl(String),
    #[error("invalid request path '{0}'")]
    Path(String),
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Typed client for the dashboard REST API.
pub struct DashboardApi {
    inner: ClientWithMiddleware,
    base_url: Url,
}

impl DashboardApi {
    /// Creates a client with a 3-attempt exponential-backoff retry policy.
    ///
    /// `base_url` must be absolute and should end with a slash so relative
    /// paths join under it (e.g. `http://localhost:8000/api/`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base_url).map_err(|_| ApiError::BaseUrl(base_url.to_string()))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
        })
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.request(Method::GET, "health", None::<&()>).await
    }

    pub async fn projects(&self) -> Result<Vec<ProjectInfo>, ApiError> {
        self.request(Method::GET, "projects", None::<&()>).await
    }

    pub async fn project_analysis(&self, project_id: i64) -> Result<AnalysisSummary, ApiError> {
        let path = format!("projects/{project_id}/analysis");
        self.request(Method::GET, &path, None::<&()>).await
    }

    pub async fn start_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisStarted, ApiError> {
        self.request(Method::POST, "analysis/start", Some(request))
            .await
    }

    pub async fn confidence_report(&self) -> Result<ConfidenceReport, ApiError> {
        self.request(Method::GET, "confidence/report", None::<&()>)
            .await
    }

    pub async fn calibrate_confidence(&self) -> Result<CalibrationResult, ApiError> {
        self.request(Method::POST, "confidence/calibrate", None::<&()>)
            .await
    }

    pub async fn ground_truth(&self) -> Result<Vec<GroundTruthEntry>, ApiError> {
        self.request(Method::GET, "ground-truth", None::<&()>).await
    }

    pub async fn add_ground_truth(
        &self,
        entry: &GroundTruthEntry,
    ) -> Result<Acknowledgement, ApiError> {
        self.request(Method::POST, "ground-truth", Some(entry)).await
    }

    /// Joins the path onto the base URL, executes, and decodes the body.
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self
            .base_url
            .join(path)
            .map_err(|_| ApiError::Path(path.to_string()))?;

        log::debug!("API request: {method} {full_url}");

        let mut req = self.inner.request(method, full_url);
        if let Some(body) = body {
            let json_body = serde_json::to_string(body)?;
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(json_body);
        }

        let response = req.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            log::error!("API error {status}: {body}");
            Err(ApiError::Status { status, body })
        }
    }
}
