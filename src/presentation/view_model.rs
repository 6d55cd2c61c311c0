// View model - display-ready KPI text, chart series and violation rows
use crate::domain::measurement::{SeriesPoint, Stats, Thresholds, ViolationKind, ViolationRecord};
use crate::domain::snapshot::{ChannelSummary, StatsSource, Summary};
use serde::Serialize;

/// Shown wherever a value is not available
pub const PLACEHOLDER: &str = "--";

pub fn format_temperature(value: f64) -> String {
    format!("{:.1}°C", value)
}

pub fn format_humidity(value: f64) -> String {
    format!("{:.1}%", value)
}

fn format_optional(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Integer with thousands separators, e.g. `12,345`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub value: String,
    pub range: String,
    pub source: StatsSource,
}

impl Kpi {
    fn from_channel(channel: &ChannelSummary, format: fn(f64) -> String) -> Self {
        let (value, range) = match channel.stats {
            Some(Stats { mean, min, max }) => (format(mean), format!("{} - {}", format(min), format(max))),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };
        Self {
            value,
            range,
            source: channel.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiPanel {
    pub temperature: Kpi,
    pub humidity: Kpi,
    pub total_measurements: String,
    pub violations: String,
    pub violation_rate: String,
}

impl KpiPanel {
    pub fn from_summary(summary: &Summary) -> Self {
        let violation_rate = if summary.total_measurements > 0 {
            format!(
                "{:.1}%",
                summary.violations_count as f64 / summary.total_measurements as f64 * 100.0
            )
        } else {
            PLACEHOLDER.to_string()
        };

        Self {
            temperature: Kpi::from_channel(&summary.temperature, format_temperature),
            humidity: Kpi::from_channel(&summary.humidity, format_humidity),
            total_measurements: format_count(summary.total_measurements),
            violations: format_count(summary.violations_count),
            violation_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Unix milliseconds
    pub t: i64,
    pub v: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub temperature: Vec<ChartPoint>,
    pub humidity: Vec<ChartPoint>,
    pub thresholds: Thresholds,
}

impl ChartView {
    pub fn empty(thresholds: Thresholds) -> Self {
        Self {
            temperature: Vec::new(),
            humidity: Vec::new(),
            thresholds,
        }
    }

    pub fn from_series(series: &[SeriesPoint], thresholds: Thresholds) -> Self {
        let channel = |pick: fn(&SeriesPoint) -> Option<f64>| {
            series
                .iter()
                .filter_map(|p| {
                    pick(p).map(|v| ChartPoint {
                        t: p.timestamp.timestamp_millis(),
                        v,
                    })
                })
                .collect::<Vec<_>>()
        };

        Self {
            temperature: channel(|p| p.temperature),
            humidity: channel(|p| p.humidity),
            thresholds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRow {
    pub timestamp: String,
    pub temperature: String,
    pub humidity: String,
    pub reason: String,
    pub kind: ViolationKind,
    pub kind_label: &'static str,
}

impl ViolationRow {
    pub fn from_record(record: &ViolationRecord, thresholds: &Thresholds) -> Self {
        Self {
            timestamp: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            temperature: format_optional(record.temperature, format_temperature),
            humidity: format_optional(record.humidity, format_humidity),
            reason: record.display_reason(thresholds),
            kind: record.kind,
            kind_label: record.kind.label(),
        }
    }
}
