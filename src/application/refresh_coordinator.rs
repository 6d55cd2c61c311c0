// Refresh coordinator - initial load, auto-refresh and manual refresh of the dashboard
use crate::application::analytics_service::AnalyticsService;
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::application::view_sink::{DataReady, Notice, ViewSink};
use crate::domain::analytics::AnalyticsPanel;
use crate::domain::measurement::Thresholds;
use crate::domain::period::Period;
use crate::domain::snapshot::{RawSnapshot, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Default auto-refresh interval
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Initial,
    PeriodChange,
    Timer,
    Manual,
    ForceCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyLoading,
    ShutDown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Applied {
        generation: u64,
        points: usize,
        violations: usize,
    },
    Failed {
        error: String,
    },
    Skipped {
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshState {
    pub phase: RefreshPhase,
    pub last_update: Option<DateTime<Utc>>,
    pub current_period: Period,
    /// Bumped on every period change; a cycle applies only if it still matches
    pub generation: u64,
    /// Generation of the snapshot currently on screen
    pub applied_generation: Option<u64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub interval: Duration,
    pub max_points: usize,
    pub violations_limit: u32,
    pub thresholds: Thresholds,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            interval: REFRESH_INTERVAL,
            max_points: 1000,
            violations_limit: 20,
            thresholds: Thresholds::default(),
        }
    }
}

pub struct RefreshCoordinator {
    api: Arc<dyn DashboardApi>,
    sink: Arc<dyn ViewSink>,
    analytics: AnalyticsService,
    settings: CoordinatorSettings,
    state: Mutex<RefreshState>,
    wake: Notify,
    shutdown: watch::Sender<bool>,
}

impl RefreshCoordinator {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        sink: Arc<dyn ViewSink>,
        analytics: AnalyticsService,
        settings: CoordinatorSettings,
        period: Period,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            api,
            sink,
            analytics,
            settings,
            state: Mutex::new(RefreshState {
                phase: RefreshPhase::Idle,
                last_update: None,
                current_period: period,
                generation: 0,
                applied_generation: None,
                last_error: None,
            }),
            wake: Notify::new(),
            shutdown,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RefreshState {
        self.lock_state().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Select a new period. Any in-flight cycle becomes stale and the loop wakes
    /// to load the new period. Returns false if the period was already selected.
    pub fn set_period(&self, period: Period) -> bool {
        {
            let mut state = self.lock_state();
            if state.current_period == period {
                return false;
            }
            state.current_period = period;
            state.generation += 1;
            tracing::info!(%period, generation = state.generation, "Period changed");
        }
        self.wake.notify_one();
        true
    }

    /// Idle -> Loading, or the reason a new cycle may not start. Phase changes
    /// are published under the state lock so the view sees them in order.
    fn begin_cycle(&self) -> Result<(Period, u64), SkipReason> {
        if self.is_shut_down() {
            return Err(SkipReason::ShutDown);
        }
        let mut state = self.lock_state();
        if state.phase == RefreshPhase::Loading {
            return Err(SkipReason::AlreadyLoading);
        }
        state.phase = RefreshPhase::Loading;
        self.sink.phase_changed(RefreshPhase::Loading);
        Ok((state.current_period, state.generation))
    }

    /// True once the selected period has been applied, so a late wake-up has nothing to do
    fn period_applied(&self) -> bool {
        let state = self.lock_state();
        state.applied_generation == Some(state.generation)
    }

    async fn fetch(&self, period: &Period) -> Result<(RawSnapshot, AnalyticsPanel), ApiError> {
        // All requests pending at once; wait for every one to settle
        let (summary, series, violations, analytics) = tokio::join!(
            self.api.fetch_summary(period),
            self.api.fetch_series(period, self.settings.max_points),
            self.api.fetch_violations(period, self.settings.violations_limit),
            self.analytics.load(period),
        );

        let raw = RawSnapshot {
            summary: summary?,
            series: series?,
            violations: violations?,
        };
        Ok((raw, analytics))
    }

    /// Run one refresh cycle unless one is already in flight
    pub async fn refresh(&self, trigger: Trigger) -> CycleOutcome {
        match self.begin_cycle() {
            Ok((period, generation)) => self.run_cycle(trigger, period, generation).await,
            Err(reason) => {
                tracing::debug!(?trigger, ?reason, "Refresh skipped");
                CycleOutcome::Skipped { reason }
            }
        }
    }

    /// Fetch and apply on a cycle already claimed by `begin_cycle`
    async fn run_cycle(&self, trigger: Trigger, mut period: Period, mut generation: u64) -> CycleOutcome {
        tracing::info!(?trigger, %period, generation, "Refresh cycle started");

        loop {
            let result = self.fetch(&period).await;

            let mut state = self.lock_state();
            if state.generation != generation {
                tracing::info!(
                    stale = generation,
                    current = state.generation,
                    "Discarding stale response, reloading for current period"
                );
                period = state.current_period;
                generation = state.generation;
                continue;
            }

            let (raw, analytics) = match result {
                Ok(fetched) => fetched,
                Err(e) => {
                    drop(state);
                    return self.fail_cycle(trigger, "Could not refresh dashboard data", e);
                }
            };

            let snapshot = Snapshot::assemble(
                raw,
                period,
                generation,
                self.settings.max_points,
                &self.settings.thresholds,
            );

            // Applied under the state lock so a concurrent period change can't interleave
            self.sink.apply_snapshot(&snapshot, &analytics);
            state.last_update = Some(snapshot.fetched_at);
            state.last_error = None;
            state.applied_generation = Some(generation);
            state.phase = RefreshPhase::Idle;
            self.sink.phase_changed(RefreshPhase::Idle);
            drop(state);

            let ready = DataReady::from(&snapshot);
            self.sink.data_ready(&ready);
            tracing::info!(
                ?trigger,
                generation,
                points = ready.points,
                violations = ready.violations,
                "Refresh cycle applied"
            );

            return CycleOutcome::Applied {
                generation,
                points: ready.points,
                violations: ready.violations,
            };
        }
    }

    /// Loading -> Error -> Idle; the previously applied snapshot stays on screen
    fn fail_cycle(&self, trigger: Trigger, context: &str, error: ApiError) -> CycleOutcome {
        let message = error.to_string();
        tracing::error!(?trigger, error = %message, "{}", context);

        // Error and back to Idle in one critical section; no cycle can start in between
        let mut state = self.lock_state();
        state.last_error = Some(message.clone());
        state.phase = RefreshPhase::Error;
        self.sink.phase_changed(RefreshPhase::Error);
        self.sink.report(&Notice::error(format!("{}: {}", context, message)));
        state.phase = RefreshPhase::Idle;
        self.sink.phase_changed(RefreshPhase::Idle);
        drop(state);

        CycleOutcome::Failed { error: message }
    }

    /// Ask the backend to advance one step, then refresh. The cycle is claimed
    /// before the POST so concurrent requests can't advance the backend twice.
    pub async fn force_cycle(&self) -> CycleOutcome {
        if let Err(reason) = self.begin_cycle() {
            tracing::debug!(?reason, "Force cycle skipped");
            return CycleOutcome::Skipped { reason };
        }

        match self.api.force_cycle().await {
            Ok(ack) if ack.acknowledged() => {
                tracing::info!(message = ?ack.message, "Force cycle acknowledged");
                self.sink.report(&Notice::info("Backend advanced one monitoring cycle"));
            }
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| "no reason given".to_string());
                tracing::warn!(%message, "Force cycle declined");
                self.sink
                    .report(&Notice::warning(format!("Backend declined the cycle: {}", message)));
            }
            Err(e) => return self.fail_cycle(Trigger::ForceCycle, "Could not force a cycle", e),
        }

        self.analytics.invalidate();
        // Pick up a period change made while the POST was in flight
        let (period, generation) = {
            let state = self.lock_state();
            (state.current_period, state.generation)
        };
        self.run_cycle(Trigger::ForceCycle, period, generation).await
    }

    /// Auto-refresh loop: initial load, then one cycle per interval or period change
    pub async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        if self.is_shut_down() {
            return;
        }

        self.refresh(Trigger::Initial).await;

        loop {
            self.analytics.prune();

            // Timer re-armed after every completed cycle
            let trigger = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = self.wake.notified() => {
                    if self.period_applied() {
                        tracing::debug!("Period change already served by the last cycle");
                        continue;
                    }
                    Trigger::PeriodChange
                }
                _ = tokio::time::sleep(self.settings.interval) => Trigger::Timer,
            };
            self.refresh(trigger).await;
        }

        tracing::info!("Refresh loop stopped");
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
