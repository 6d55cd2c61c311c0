// Period domain model - the days-of-history window a refresh cycle loads
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Day counts the dashboard offers in its period selector
pub const SUPPORTED_DAYS: [u32; 4] = [1, 7, 30, 90];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("unsupported period of {0} days (expected one of 1, 7, 30, 90)")]
    Unsupported(u32),
    #[error("custom range start {start} must be before end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// A validated day count from [`SUPPORTED_DAYS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PeriodDays(u32);

impl PeriodDays {
    pub fn new(days: u32) -> Result<Self, PeriodError> {
        if SUPPORTED_DAYS.contains(&days) {
            Ok(Self(days))
        } else {
            Err(PeriodError::Unsupported(days))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Period {
    Days { days: PeriodDays },
    Custom { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn days(days: u32) -> Result<Self, PeriodError> {
        Ok(Period::Days {
            days: PeriodDays::new(days)?,
        })
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start >= end {
            return Err(PeriodError::InvertedRange { start, end });
        }
        Ok(Period::Custom { start, end })
    }

    /// Query parameters the backend uses to filter by this period
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Period::Days { days } => vec![("days", days.get().to_string())],
            Period::Custom { start, end } => vec![
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
            ],
        }
    }

    pub fn label(&self) -> String {
        match self {
            Period::Days { days } if days.get() == 1 => "Last 24 hours".to_string(),
            Period::Days { days } => format!("Last {} days", days.get()),
            Period::Custom { start, end } => format!("{} to {}", start, end),
        }
    }

    /// Filesystem-safe slug, used in exported report names
    pub fn slug(&self) -> String {
        match self {
            Period::Days { days } => format!("{}d", days.get()),
            Period::Custom { start, end } => {
                format!("{}_{}", start.format("%Y%m%d"), end.format("%Y%m%d"))
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Request body accepted when the user picks a period
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PeriodRequest {
    Days { days: u32 },
    Custom { start: NaiveDate, end: NaiveDate },
}

impl TryFrom<PeriodRequest> for Period {
    type Error = PeriodError;

    fn try_from(request: PeriodRequest) -> Result<Self, Self::Error> {
        match request {
            PeriodRequest::Days { days } => Period::days(days),
            PeriodRequest::Custom { start, end } => Period::custom(start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_supported_days() {
        for days in SUPPORTED_DAYS {
            assert!(Period::days(days).is_ok());
        }
        assert_eq!(Period::days(14), Err(PeriodError::Unsupported(14)));
        assert_eq!(Period::days(0), Err(PeriodError::Unsupported(0)));
    }

    #[test]
    fn test_custom_range_must_be_ordered() {
        assert!(Period::custom(date("2024-01-01"), date("2024-01-31")).is_ok());
        assert!(matches!(
            Period::custom(date("2024-01-31"), date("2024-01-01")),
            Err(PeriodError::InvertedRange { .. })
        ));
        assert!(Period::custom(date("2024-01-01"), date("2024-01-01")).is_err());
    }

    #[test]
    fn test_query_pairs() {
        let period = Period::days(30).unwrap();
        assert_eq!(period.query_pairs(), vec![("days", "30".to_string())]);

        let period = Period::custom(date("2024-03-01"), date("2024-03-15")).unwrap();
        assert_eq!(
            period.query_pairs(),
            vec![
                ("start_date", "2024-03-01".to_string()),
                ("end_date", "2024-03-15".to_string()),
            ]
        );
    }

    #[test]
    fn test_labels_and_slugs() {
        assert_eq!(Period::days(1).unwrap().label(), "Last 24 hours");
        assert_eq!(Period::days(7).unwrap().label(), "Last 7 days");
        assert_eq!(Period::days(90).unwrap().slug(), "90d");

        let period = Period::custom(date("2024-03-01"), date("2024-03-15")).unwrap();
        assert_eq!(period.label(), "2024-03-01 to 2024-03-15");
        assert_eq!(period.slug(), "20240301_20240315");
    }

    #[test]
    fn test_period_request_parsing() {
        let request: PeriodRequest = serde_json::from_str(r#"{"days": 7}"#).unwrap();
        assert_eq!(Period::try_from(request).unwrap(), Period::days(7).unwrap());

        let request: PeriodRequest =
            serde_json::from_str(r#"{"start": "2024-05-10", "end": "2024-05-01"}"#).unwrap();
        assert!(Period::try_from(request).is_err());
    }

    #[test]
    fn test_period_serializes_flat() {
        let json = serde_json::to_value(Period::days(7).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"days": 7}));
    }
}
