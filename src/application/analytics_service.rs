// Analytics service - auxiliary insight payloads, cached and allowed to fail
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::domain::analytics::{AnalyticsKind, AnalyticsPanel, Availability};
use crate::domain::period::Period;
use crate::infrastructure::ttl_cache::TtlCache;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct AnalyticsService {
    api: Arc<dyn DashboardApi>,
    cache: TtlCache<(AnalyticsKind, Period), Value>,
    ttl: Duration,
}

impl AnalyticsService {
    pub fn new(api: Arc<dyn DashboardApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: TtlCache::new(),
            ttl,
        }
    }

    /// Load all four resources concurrently; failures become `Unavailable`
    pub async fn load(&self, period: &Period) -> AnalyticsPanel {
        let (insights, anomalies, predictions, patterns) = tokio::join!(
            self.fetch(AnalyticsKind::Insights, period),
            self.fetch(AnalyticsKind::Anomalies, period),
            self.fetch(AnalyticsKind::Predictions, period),
            self.fetch(AnalyticsKind::Patterns, period),
        );

        AnalyticsPanel {
            insights: availability(AnalyticsKind::Insights, insights),
            anomalies: availability(AnalyticsKind::Anomalies, anomalies),
            predictions: availability(AnalyticsKind::Predictions, predictions),
            patterns: availability(AnalyticsKind::Patterns, patterns),
        }
    }

    /// Drop cached payloads, e.g. after the backend state was advanced
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Evict expired payloads. Keys for periods nobody asks for again would
    /// otherwise stay in memory until the next invalidation.
    pub fn prune(&self) {
        if self.cache.is_empty() {
            return;
        }
        let purged = self.cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = self.cache.len(), "Pruned analytics cache");
        }
    }

    async fn fetch(&self, kind: AnalyticsKind, period: &Period) -> Result<Value, ApiError> {
        let key = (kind, *period);
        if let Some(body) = self.cache.get(&key) {
            return Ok(body);
        }

        let body = self.api.fetch_analytics(kind, period).await?;
        // Backend-side errors come back as 200 with an `error` field; don't pin them
        if body.get("error").is_none() {
            self.cache.insert(key, body.clone(), self.ttl);
        }
        Ok(body)
    }
}

fn availability<T: DeserializeOwned>(kind: AnalyticsKind, result: Result<Value, ApiError>) -> Availability<T> {
    match result {
        Ok(body) => Availability::from_body(body),
        Err(e) => {
            tracing::warn!(kind = kind.path_segment(), error = %e, "Analytics unavailable");
            Availability::unavailable(e.to_string())
        }
    }
}
