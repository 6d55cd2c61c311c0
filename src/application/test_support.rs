// In-memory doubles for the backend API and the view sink
use crate::application::dashboard_api::{ApiError, DashboardApi, ForceCycleAck};
use crate::application::refresh_coordinator::RefreshPhase;
use crate::application::view_sink::{DataReady, Notice, ViewSink};
use crate::domain::analytics::{AnalyticsKind, AnalyticsPanel};
use crate::domain::measurement::SummaryWire;
use crate::domain::period::Period;
use crate::domain::snapshot::Snapshot;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub struct FakeApi {
    pub summary: Mutex<Result<SummaryWire, ApiError>>,
    pub series: Mutex<Result<Vec<Value>, ApiError>>,
    pub violations: Mutex<Result<Vec<Value>, ApiError>>,
    pub analytics: Mutex<HashMap<AnalyticsKind, Result<Value, ApiError>>>,
    pub force: Mutex<Result<ForceCycleAck, ApiError>>,
    pub report: Mutex<Result<Bytes, ApiError>>,
    /// When set, series fetches wait for a permit
    pub gate: Mutex<Option<Arc<Semaphore>>>,
    /// Signalled whenever a series fetch starts
    pub series_started: Notify,
    /// When set, force-cycle calls wait for a permit
    pub force_gate: Mutex<Option<Arc<Semaphore>>>,
    pub force_started: Notify,
    pub series_periods: Mutex<Vec<Period>>,
    pub report_paths: Mutex<Vec<String>>,
    pub summary_calls: AtomicUsize,
    pub analytics_calls: AtomicUsize,
    pub force_calls: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            summary: Mutex::new(Ok(SummaryWire::default())),
            series: Mutex::new(Ok(sample_series())),
            violations: Mutex::new(Ok(vec![json!({
                "timestamp": "2024-05-01T10:05:00Z",
                "temperature": 20.1,
                "humidity": 55.0,
                "reason": null
            })])),
            analytics: Mutex::new(HashMap::new()),
            force: Mutex::new(Ok(ForceCycleAck {
                success: Some(true),
                status: None,
                message: Some("ok".to_string()),
            })),
            report: Mutex::new(Ok(Bytes::from_static(b"%PDF-1.7"))),
            gate: Mutex::new(None),
            series_started: Notify::new(),
            force_gate: Mutex::new(None),
            force_started: Notify::new(),
            series_periods: Mutex::new(Vec::new()),
            report_paths: Mutex::new(Vec::new()),
            summary_calls: AtomicUsize::new(0),
            analytics_calls: AtomicUsize::new(0),
            force_calls: AtomicUsize::new(0),
        }
    }
}

pub fn sample_series() -> Vec<Value> {
    vec![
        json!({"timestamp": "2024-05-01T10:00:00Z", "temperature": 18.0, "humidity": 55.0}),
        json!({"timestamp": "2024-05-01T10:05:00Z", "temperature": 20.1, "humidity": 55.0}),
        json!({"timestamp": "2024-05-01T10:10:00Z", "temperature": 18.5, "humidity": 58.0}),
    ]
}

impl FakeApi {
    pub fn set_analytics(&self, kind: AnalyticsKind, result: Result<Value, ApiError>) {
        self.analytics.lock().unwrap().insert(kind, result);
    }

    /// Hold series fetches until permits are added to the returned semaphore
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold force-cycle calls until permits are added to the returned semaphore
    pub fn close_force_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.force_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_summary(&self, _period: &Period) -> Result<SummaryWire, ApiError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.summary.lock().unwrap().clone()
    }

    async fn fetch_series(&self, period: &Period, _max_points: usize) -> Result<Vec<Value>, ApiError> {
        self.series_periods.lock().unwrap().push(*period);
        self.series_started.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        self.series.lock().unwrap().clone()
    }

    async fn fetch_violations(&self, _period: &Period, _limit: u32) -> Result<Vec<Value>, ApiError> {
        self.violations.lock().unwrap().clone()
    }

    async fn fetch_analytics(&self, kind: AnalyticsKind, _period: &Period) -> Result<Value, ApiError> {
        self.analytics_calls.fetch_add(1, Ordering::SeqCst);
        self.analytics
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Ok(json!({})))
    }

    async fn force_cycle(&self) -> Result<ForceCycleAck, ApiError> {
        self.force_calls.fetch_add(1, Ordering::SeqCst);
        self.force_started.notify_one();

        let gate = self.force_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        self.force.lock().unwrap().clone()
    }

    async fn download_report(&self, path: &str, _period: &Period) -> Result<Bytes, ApiError> {
        self.report_paths.lock().unwrap().push(path.to_string());
        self.report.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub snapshots: Mutex<Vec<Snapshot>>,
    pub notices: Mutex<Vec<Notice>>,
    pub ready: Mutex<Vec<DataReady>>,
    pub phases: Mutex<Vec<RefreshPhase>>,
}

impl RecordingSink {
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl ViewSink for RecordingSink {
    fn apply_snapshot(&self, snapshot: &Snapshot, _analytics: &AnalyticsPanel) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn report(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn data_ready(&self, event: &DataReady) {
        self.ready.lock().unwrap().push(event.clone());
    }

    fn phase_changed(&self, phase: RefreshPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}
