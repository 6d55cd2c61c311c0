// Analytics domain models - auxiliary insight payloads computed by the backend
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    Insights,
    Anomalies,
    Predictions,
    Patterns,
}

impl AnalyticsKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            AnalyticsKind::Insights => "insights",
            AnalyticsKind::Anomalies => "anomalies",
            AnalyticsKind::Predictions => "predictions",
            AnalyticsKind::Patterns => "patterns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable {
            reason: reason.into(),
        }
    }
}

impl<T: DeserializeOwned> Availability<T> {
    /// Decode an analytics body; the backend reports its own failures as `{"error": ...}`
    pub fn from_body(body: Value) -> Self {
        if let Some(error) = body.get("error") {
            let reason = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Availability::unavailable(reason);
        }

        match serde_json::from_value(body) {
            Ok(report) => Availability::Available(report),
            Err(e) => Availability::unavailable(format!("malformed payload: {}", e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    #[serde(default)]
    pub violation_rate: Option<f64>,
    #[serde(default)]
    pub temperature_variance: Option<f64>,
    #[serde(default)]
    pub data_quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub summary: Option<InsightSummary>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "relative_humidity")]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub temp_zscore: Option<f64>,
    #[serde(default)]
    pub hum_zscore: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub total_measurements: Option<u64>,
    #[serde(default)]
    pub anomaly_rate: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: String,
    #[serde(default)]
    pub predicted_temperature: Option<f64>,
    #[serde(default)]
    pub predicted_humidity: Option<f64>,
    #[serde(default)]
    pub violation_probability: Option<f64>,
    #[serde(default)]
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    #[serde(default)]
    pub temperature_trend: Option<String>,
    #[serde(default)]
    pub humidity_trend: Option<String>,
    /// Degrees per hour
    #[serde(default)]
    pub temp_slope: Option<f64>,
    /// Percentage points per hour
    #[serde(default)]
    pub hum_slope: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub trend_analysis: Option<TrendAnalysis>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBucket {
    #[serde(default)]
    pub avg_temp: Option<f64>,
    #[serde(default)]
    pub avg_humidity: Option<f64>,
    #[serde(default)]
    pub sample_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    #[serde(default)]
    pub hourly_patterns: BTreeMap<String, PatternBucket>,
    #[serde(default)]
    pub daily_patterns: BTreeMap<String, PatternBucket>,
    #[serde(default)]
    pub total_measurements: Option<u64>,
    #[serde(default)]
    pub violation_rate: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPanel {
    pub insights: Availability<InsightsReport>,
    pub anomalies: Availability<AnomalyReport>,
    pub predictions: Availability<PredictionReport>,
    pub patterns: Availability<PatternReport>,
}

impl AnalyticsPanel {
    pub fn pending() -> Self {
        Self {
            insights: Availability::unavailable("not loaded yet"),
            anomalies: Availability::unavailable("not loaded yet"),
            predictions: Availability::unavailable("not loaded yet"),
            patterns: Availability::unavailable("not loaded yet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body_is_unavailable() {
        let report: Availability<InsightsReport> =
            Availability::from_body(json!({"error": "database offline"}));
        assert_eq!(report, Availability::unavailable("database offline"));
    }

    #[test]
    fn test_insufficient_data_is_still_available() {
        let report: Availability<InsightsReport> = Availability::from_body(json!({
            "insights": [],
            "message": "Dados insuficientes para gerar insights"
        }));
        match report {
            Availability::Available(r) => {
                assert!(r.insights.is_empty());
                assert!(r.message.is_some());
            }
            other => panic!("expected available, got {:?}", other),
        }
    }

    #[test]
    fn test_anomaly_report_parsing() {
        let report: Availability<AnomalyReport> = Availability::from_body(json!({
            "anomalies": [{
                "timestamp": "2024-05-01T10:00:00-03:00",
                "temperature": 21.2,
                "relative_humidity": 70.1,
                "temp_zscore": 2.4,
                "hum_zscore": 3.1,
                "severity": "high"
            }],
            "total_measurements": 120,
            "anomaly_rate": 0.83
        }));
        let Availability::Available(report) = report else {
            panic!("expected available");
        };
        assert_eq!(report.anomalies[0].humidity, Some(70.1));
        assert_eq!(report.anomalies[0].severity.as_deref(), Some("high"));
    }

    #[test]
    fn test_malformed_body_is_unavailable() {
        let report: Availability<PredictionReport> =
            Availability::from_body(json!({"predictions": "soon"}));
        assert!(matches!(report, Availability::Unavailable { .. }));
    }

    #[test]
    fn test_prediction_report_tolerates_missing_fields() {
        let report: Availability<PredictionReport> = Availability::from_body(json!({
            "predictions": [
                {"timestamp": "t1", "violation_probability": 10.0},
                {"timestamp": "t2"}
            ]
        }));
        match report {
            Availability::Available(r) => {
                assert_eq!(r.predictions.len(), 2);
                assert_eq!(r.predictions[1].violation_probability, None);
                assert!(r.trend_analysis.is_none());
            }
            other => panic!("expected available report, got {:?}", other),
        }
    }

    #[test]
    fn test_availability_serialization() {
        let value = serde_json::to_value(Availability::<PatternReport>::unavailable("offline")).unwrap();
        assert_eq!(value, json!({"status": "unavailable", "reason": "offline"}));
    }
}
