// HTTP implementation of the dashboard backend API
use crate::application::dashboard_api::{ApiError, DashboardApi, ForceCycleAck};
use crate::domain::analytics::AnalyticsKind;
use crate::domain::measurement::SummaryWire;
use crate::domain::period::Period;
use crate::infrastructure::config::{ApiSettings, RefreshSettings};
use crate::infrastructure::retry::RetryPolicy;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
    prefix: String,
    cache_bust: bool,
    trailing_slash: bool,
    retry: RetryPolicy,
    prediction_hours: u32,
}

type Params = Vec<(&'static str, String)>;

const JSON: &str = "application/json";
/// Reports are binary; the content type depends on the format
const ANY: &str = "*/*";

impl HttpDashboardApi {
    pub fn new(api: &ApiSettings, refresh: &RefreshSettings, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            prefix: format!("/{}", api.prefix.trim_matches('/')),
            cache_bust: api.cache_bust,
            trailing_slash: api.trailing_slash,
            retry,
            prediction_hours: refresh.prediction_hours,
        }
    }

    fn resource_path(&self, resource: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), resource)
    }

    fn build_url(&self, path: &str, params: &[(&'static str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if self.trailing_slash && !url.ends_with('/') {
            url.push('/');
        }

        let mut pairs: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        if self.cache_bust {
            pairs.push(format!("_={}", chrono::Utc::now().timestamp_millis()));
        }

        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    async fn send_get(&self, url: &str, accept: &str, attempt: u32) -> Result<Bytes, ApiError> {
        tracing::debug!(%url, attempt, "GET");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// GET with retry; the cache-busting parameter is regenerated per attempt
    async fn get_bytes(
        &self,
        label: &str,
        path: &str,
        params: Params,
        accept: &'static str,
    ) -> Result<Bytes, ApiError> {
        self.retry
            .run(label, |attempt| {
                let url = self.build_url(path, &params);
                async move { self.send_get(&url, accept, attempt).await }
            })
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        params: Params,
    ) -> Result<T, ApiError> {
        let body = self.get_bytes(label, path, params, JSON).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(format!("{}: {}", label, e)))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_summary(&self, period: &Period) -> Result<SummaryWire, ApiError> {
        self.get_json("summary", &self.resource_path("summary"), period.query_pairs())
            .await
    }

    async fn fetch_series(&self, period: &Period, max_points: usize) -> Result<Vec<Value>, ApiError> {
        let mut params = period.query_pairs();
        params.push(("max_points", max_points.to_string()));
        self.get_json("series", &self.resource_path("series"), params)
            .await
    }

    async fn fetch_violations(&self, period: &Period, limit: u32) -> Result<Vec<Value>, ApiError> {
        let mut params = period.query_pairs();
        params.push(("limit", limit.to_string()));
        self.get_json("violations", &self.resource_path("violations"), params)
            .await
    }

    async fn fetch_analytics(&self, kind: AnalyticsKind, period: &Period) -> Result<Value, ApiError> {
        let params = match kind {
            AnalyticsKind::Predictions => vec![("hours", self.prediction_hours.to_string())],
            _ => period.query_pairs(),
        };
        let path = self.resource_path(&format!("ai/{}", kind.path_segment()));
        self.get_json(kind.path_segment(), &path, params).await
    }

    async fn force_cycle(&self) -> Result<ForceCycleAck, ApiError> {
        // Not idempotent, so a single attempt and no cache-busting
        let mut url = format!("{}{}", self.base_url, self.resource_path("force-cycle"));
        if self.trailing_slash {
            url.push('/');
        }
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, JSON)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        response
            .json::<ForceCycleAck>()
            .await
            .map_err(|e| ApiError::Decode(format!("force-cycle: {}", e)))
    }

    async fn download_report(&self, path: &str, period: &Period) -> Result<Bytes, ApiError> {
        self.get_bytes("report", path, period.query_pairs(), ANY).await
    }
}
