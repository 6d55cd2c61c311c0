// Measurement domain models - series samples, violations and the operating envelope
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no timestamp")]
    MissingTimestamp,
    #[error("unparseable timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("non-numeric {field} reading: {raw}")]
    NonNumeric { field: &'static str, raw: String },
}

/// Fixed operating envelope for the monitored room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temp_low: f64,
    pub temp_high: f64,
    /// Relative humidity limit, in percent
    pub rh_limit: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_low: 17.0,
            temp_high: 19.5,
            rh_limit: 62.0,
        }
    }
}

impl Thresholds {
    pub fn temperature_out_of_range(&self, temperature: Option<f64>) -> bool {
        temperature.is_some_and(|t| t < self.temp_low || t > self.temp_high)
    }

    pub fn humidity_out_of_range(&self, humidity: Option<f64>) -> bool {
        humidity.is_some_and(|h| h > self.rh_limit)
    }

    pub fn is_violation(&self, temperature: Option<f64>, humidity: Option<f64>) -> bool {
        self.temperature_out_of_range(temperature) || self.humidity_out_of_range(humidity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Mean/min/max of the given readings; `None` when there are none
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }

        (count > 0).then(|| Self {
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

/// Aggregated stats as the backend sends them; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsWire {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl StatsWire {
    /// Complete stats, or `None` if the backend left any of them out
    pub fn complete(&self) -> Option<Stats> {
        Some(Stats {
            mean: self.mean?,
            min: self.min?,
            max: self.max?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryWire {
    #[serde(default)]
    pub temperature_stats: Option<StatsWire>,
    #[serde(default)]
    pub humidity_stats: Option<StatsWire>,
    #[serde(default)]
    pub total_measurements: Option<u64>,
    #[serde(default)]
    pub violations_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Temperature,
    Humidity,
    Both,
    Unclassified,
}

impl ViolationKind {
    pub fn label(self) -> &'static str {
        match self {
            ViolationKind::Temperature => "Temperature",
            ViolationKind::Humidity => "Humidity",
            ViolationKind::Both => "Temperature & humidity",
            ViolationKind::Unclassified => "Unclassified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub reason: Option<String>,
    pub kind: ViolationKind,
}

impl ViolationRecord {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        reason: Option<String>,
        thresholds: &Thresholds,
    ) -> Self {
        let reason = reason.filter(|r| !r.trim().is_empty());
        let kind = classify(temperature, humidity, reason.as_deref(), thresholds);
        Self {
            timestamp,
            temperature,
            humidity,
            reason,
            kind,
        }
    }

    /// Reason text for display, synthesised from the readings when the backend sent none
    pub fn display_reason(&self, thresholds: &Thresholds) -> String {
        if let Some(reason) = &self.reason {
            return reason.clone();
        }

        let mut parts = Vec::new();
        if let Some(t) = self.temperature.filter(|&t| thresholds.temperature_out_of_range(Some(t))) {
            parts.push(format!(
                "Temperature {:.1}°C outside {:.1}°C - {:.1}°C",
                t, thresholds.temp_low, thresholds.temp_high
            ));
        }
        if let Some(h) = self.humidity.filter(|&h| thresholds.humidity_out_of_range(Some(h))) {
            parts.push(format!("Humidity {:.1}% above {:.1}%", h, thresholds.rh_limit));
        }

        if parts.is_empty() {
            "Outside operating envelope".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Readings decide first; the reason text is only consulted when they don't
fn classify(
    temperature: Option<f64>,
    humidity: Option<f64>,
    reason: Option<&str>,
    thresholds: &Thresholds,
) -> ViolationKind {
    let temp = thresholds.temperature_out_of_range(temperature);
    let hum = thresholds.humidity_out_of_range(humidity);

    match (temp, hum) {
        (true, true) => ViolationKind::Both,
        (true, false) => ViolationKind::Temperature,
        (false, true) => ViolationKind::Humidity,
        (false, false) => {
            let Some(reason) = reason.map(str::to_lowercase) else {
                return ViolationKind::Unclassified;
            };
            let temp = reason.contains("temp");
            let hum = reason.contains("humid") || reason.contains("umid");
            match (temp, hum) {
                (true, true) => ViolationKind::Both,
                (true, false) => ViolationKind::Temperature,
                (false, true) => ViolationKind::Humidity,
                (false, false) => ViolationKind::Unclassified,
            }
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, RecordError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }

    // Naive timestamps are taken as UTC
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| RecordError::InvalidTimestamp(raw.to_string()))
}

fn reading(record: &serde_json::Map<String, Value>, field: &'static str, aliases: &[&str]) -> Result<Option<f64>, RecordError> {
    let value = std::iter::once(field)
        .chain(aliases.iter().copied())
        .find_map(|key| record.get(key));

    let non_numeric = |raw: String| RecordError::NonNumeric { field, raw };

    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| non_numeric(n.to_string()))?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| non_numeric(s.clone()))?,
        Some(other) => return Err(non_numeric(other.to_string())),
    };

    if parsed.is_finite() {
        Ok(Some(parsed))
    } else {
        Err(non_numeric(parsed.to_string()))
    }
}

fn record_timestamp(record: &serde_json::Map<String, Value>) -> Result<DateTime<FixedOffset>, RecordError> {
    match record.get("timestamp").or_else(|| record.get("ts")) {
        Some(Value::String(s)) => parse_timestamp(s),
        Some(Value::Null) | None => Err(RecordError::MissingTimestamp),
        Some(other) => Err(RecordError::InvalidTimestamp(other.to_string())),
    }
}

pub fn parse_series_point(raw: &Value) -> Result<SeriesPoint, RecordError> {
    let record = raw.as_object().ok_or(RecordError::NotAnObject)?;
    Ok(SeriesPoint {
        timestamp: record_timestamp(record)?,
        temperature: reading(record, "temperature", &[])?,
        humidity: reading(record, "humidity", &["relative_humidity"])?,
    })
}

pub fn parse_violation(raw: &Value, thresholds: &Thresholds) -> Result<ViolationRecord, RecordError> {
    let record = raw.as_object().ok_or(RecordError::NotAnObject)?;
    let reason = record
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ViolationRecord::new(
        record_timestamp(record)?,
        reading(record, "temperature", &[])?,
        reading(record, "humidity", &["relative_humidity"])?,
        reason,
        thresholds,
    ))
}

/// Parse a raw series payload, dropping bad records and ordering by time
pub fn parse_series(raw: &[Value]) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = raw
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match parse_series_point(record) {
            Ok(point) => Some(point),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "Skipping series record");
                None
            }
        })
        .collect();

    points.sort_by_key(|p| p.timestamp);
    points
}

pub fn parse_violations(raw: &[Value], thresholds: &Thresholds) -> Vec<ViolationRecord> {
    raw.iter()
        .enumerate()
        .filter_map(|(idx, record)| match parse_violation(record, thresholds) {
            Ok(violation) => Some(violation),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "Skipping violation record");
                None
            }
        })
        .collect()
}

/// Downsample series points to at most `max_points` using bucket averaging
pub fn downsample_points(points: Vec<SeriesPoint>, max_points: usize) -> Vec<SeriesPoint> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }

    let bucket_size = points.len().div_ceil(max_points);

    points
        .chunks(bucket_size)
        .map(|chunk| {
            // Middle point's timestamp, per-channel average of the readings present
            let mid = &chunk[chunk.len() / 2];
            SeriesPoint {
                timestamp: mid.timestamp,
                temperature: average(chunk.iter().filter_map(|p| p.temperature)),
                humidity: average(chunk.iter().filter_map(|p| p.humidity)),
            }
        })
        .collect()
}

fn average<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    Stats::from_values(values).map(|s| s.mean)
}
