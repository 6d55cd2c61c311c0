// View store - in-memory dashboard view, fed by the refresh coordinator
use crate::application::refresh_coordinator::RefreshPhase;
use crate::application::view_sink::{DataReady, Notice, NoticeLevel, ViewSink};
use crate::domain::analytics::AnalyticsPanel;
use crate::domain::measurement::Thresholds;
use crate::domain::period::Period;
use crate::domain::snapshot::Snapshot;
use crate::presentation::view_model::{ChartView, KpiPanel, ViolationRow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Most recent notifications kept on screen
pub const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEntry {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub phase: RefreshPhase,
    pub period: Option<Period>,
    pub period_label: Option<String>,
    pub generation: Option<u64>,
    pub last_update: Option<DateTime<Utc>>,
    pub kpis: Option<KpiPanel>,
    pub chart: ChartView,
    pub violations: Vec<ViolationRow>,
    pub analytics: AnalyticsPanel,
    pub notifications: VecDeque<NotificationEntry>,
}

impl DashboardView {
    pub fn empty(thresholds: Thresholds) -> Self {
        Self {
            phase: RefreshPhase::Idle,
            period: None,
            period_label: None,
            generation: None,
            last_update: None,
            kpis: None,
            chart: ChartView::empty(thresholds),
            violations: Vec::new(),
            analytics: AnalyticsPanel::pending(),
            notifications: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    DataReady(DataReady),
    Notification(NotificationEntry),
    Phase { phase: RefreshPhase },
}

pub struct ViewStore {
    view: RwLock<DashboardView>,
    thresholds: Thresholds,
    next_notice: AtomicU64,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewStore {
    pub fn new(thresholds: Thresholds) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            view: RwLock::new(DashboardView::empty(thresholds)),
            thresholds,
            next_notice: AtomicU64::new(1),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DashboardView> {
        self.view.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DashboardView> {
        self.view.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> DashboardView {
        self.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Remove a notification; false if it was already gone
    pub fn dismiss(&self, id: u64) -> bool {
        let mut view = self.write();
        let before = view.notifications.len();
        view.notifications.retain(|n| n.id != id);
        view.notifications.len() != before
    }

    fn publish(&self, event: ViewEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl ViewSink for ViewStore {
    fn apply_snapshot(&self, snapshot: &Snapshot, analytics: &AnalyticsPanel) {
        let kpis = KpiPanel::from_summary(&snapshot.summary);
        let chart = ChartView::from_series(&snapshot.series, self.thresholds);
        let violations = snapshot
            .violations
            .iter()
            .map(|v| ViolationRow::from_record(v, &self.thresholds))
            .collect();

        // One write: readers never see widgets from different cycles
        let mut view = self.write();
        view.period = Some(snapshot.period);
        view.period_label = Some(snapshot.period.label());
        view.generation = Some(snapshot.generation);
        view.last_update = Some(snapshot.fetched_at);
        view.kpis = Some(kpis);
        view.chart = chart;
        view.violations = violations;
        view.analytics = analytics.clone();
    }

    fn report(&self, notice: &Notice) {
        let entry = NotificationEntry {
            id: self.next_notice.fetch_add(1, Ordering::Relaxed),
            level: notice.level,
            message: notice.message.clone(),
            at: notice.at,
        };

        {
            let mut view = self.write();
            view.notifications.push_back(entry.clone());
            while view.notifications.len() > MAX_NOTIFICATIONS {
                view.notifications.pop_front();
            }
        }
        self.publish(ViewEvent::Notification(entry));
    }

    fn data_ready(&self, event: &DataReady) {
        self.publish(ViewEvent::DataReady(event.clone()));
    }

    fn phase_changed(&self, phase: RefreshPhase) {
        self.write().phase = phase;
        self.publish(ViewEvent::Phase { phase });
    }
}
