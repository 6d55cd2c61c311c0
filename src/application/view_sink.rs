// View sink trait - anything that presents refresh results
use crate::application::refresh_coordinator::RefreshPhase;
use crate::domain::analytics::AnalyticsPanel;
use crate::domain::period::Period;
use crate::domain::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible, dismissible notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// Fired once per applied cycle so the view can run its own reveal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataReady {
    pub generation: u64,
    pub period: Period,
    pub fetched_at: DateTime<Utc>,
    pub points: usize,
    pub violations: usize,
}

impl From<&Snapshot> for DataReady {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            generation: snapshot.generation,
            period: snapshot.period,
            fetched_at: snapshot.fetched_at,
            points: snapshot.series.len(),
            violations: snapshot.violations.len(),
        }
    }
}

/// Presentation side of the refresh coordinator. Calls are synchronous and
/// made between suspension points, so an implementation sees each snapshot
/// as one atomic update.
pub trait ViewSink: Send + Sync {
    fn apply_snapshot(&self, snapshot: &Snapshot, analytics: &AnalyticsPanel);

    fn report(&self, notice: &Notice);

    fn data_ready(&self, event: &DataReady);

    fn phase_changed(&self, _phase: RefreshPhase) {}
}
