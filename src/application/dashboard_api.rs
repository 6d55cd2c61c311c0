// Backend API trait - the seam the refresh coordinator fetches through
use crate::domain::analytics::AnalyticsKind;
use crate::domain::measurement::SummaryWire;
use crate::domain::period::Period;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Network failures and non-2xx statuses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Status { .. })
    }
}

/// Acknowledgment of `POST /api/force-cycle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceCycleAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ForceCycleAck {
    pub fn acknowledged(&self) -> bool {
        match (self.success, self.status.as_deref()) {
            (Some(success), _) => success,
            (None, Some(status)) => !status.eq_ignore_ascii_case("error"),
            (None, None) => true,
        }
    }
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /api/summary` - aggregated stats for the period
    async fn fetch_summary(&self, period: &Period) -> Result<SummaryWire, ApiError>;

    /// `GET /api/series` - raw samples, at most `max_points`
    async fn fetch_series(&self, period: &Period, max_points: usize) -> Result<Vec<Value>, ApiError>;

    /// `GET /api/violations` - most recent out-of-envelope samples
    async fn fetch_violations(&self, period: &Period, limit: u32) -> Result<Vec<Value>, ApiError>;

    /// `GET /api/ai/{kind}` - auxiliary analytics, returned undecoded
    async fn fetch_analytics(&self, kind: AnalyticsKind, period: &Period) -> Result<Value, ApiError>;

    /// `POST /api/force-cycle` - advance the backend one step
    async fn force_cycle(&self) -> Result<ForceCycleAck, ApiError>;

    /// `GET /reports/{format}` - binary report export
    async fn download_report(&self, path: &str, period: &Period) -> Result<Bytes, ApiError>;
}
