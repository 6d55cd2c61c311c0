// Snapshot domain model - the (summary, series, violations) triple of one refresh cycle
use super::measurement::{
    downsample_points, parse_series, parse_violations, SeriesPoint, Stats, StatsWire, SummaryWire, Thresholds,
    ViolationRecord,
};
use super::period::Period;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    Backend,
    DerivedFromSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub stats: Option<Stats>,
    pub source: StatsSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub temperature: ChannelSummary,
    pub humidity: ChannelSummary,
    pub total_measurements: u64,
    pub violations_count: u64,
}

impl Summary {
    /// Build the KPI summary, deriving whatever the backend left out from the parsed series
    pub fn reconcile(wire: &SummaryWire, series: &[SeriesPoint], thresholds: &Thresholds) -> Self {
        let temperature = channel(wire.temperature_stats.as_ref(), || {
            Stats::from_values(series.iter().filter_map(|p| p.temperature))
        });
        let humidity = channel(wire.humidity_stats.as_ref(), || {
            Stats::from_values(series.iter().filter_map(|p| p.humidity))
        });

        let total_measurements = wire
            .total_measurements
            .unwrap_or(series.len() as u64);
        let violations_count = wire.violations_count.unwrap_or_else(|| {
            series
                .iter()
                .filter(|p| thresholds.is_violation(p.temperature, p.humidity))
                .count() as u64
        });

        Self {
            temperature,
            humidity,
            total_measurements,
            violations_count,
        }
    }
}

fn channel(wire: Option<&StatsWire>, derive: impl FnOnce() -> Option<Stats>) -> ChannelSummary {
    match wire.and_then(StatsWire::complete) {
        Some(stats) => ChannelSummary {
            stats: Some(stats),
            source: StatsSource::Backend,
        },
        None => ChannelSummary {
            stats: derive(),
            source: StatsSource::DerivedFromSeries,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub period: Period,
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub summary: Summary,
    pub series: Vec<SeriesPoint>,
    pub violations: Vec<ViolationRecord>,
}

/// Raw payloads of one cycle, before per-record parsing
#[derive(Debug, Clone, Default)]
pub struct RawSnapshot {
    pub summary: SummaryWire,
    pub series: Vec<Value>,
    pub violations: Vec<Value>,
}

impl Snapshot {
    pub fn assemble(
        raw: RawSnapshot,
        period: Period,
        generation: u64,
        max_points: usize,
        thresholds: &Thresholds,
    ) -> Self {
        // KPIs come from every valid sample; only the chart series is downsampled
        let valid = parse_series(&raw.series);
        let summary = Summary::reconcile(&raw.summary, &valid, thresholds);
        let series = downsample_points(valid, max_points);
        let violations = parse_violations(&raw.violations, thresholds);

        Self {
            period,
            generation,
            fetched_at: Utc::now(),
            summary,
            series,
            violations,
        }
    }
}
