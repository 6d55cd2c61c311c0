// Report service - binary report export for the selected period
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::domain::period::Period;
use bytes::Bytes;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unknown report format {0:?} (expected pdf or excel)")]
    UnknownFormat(String),
    #[error("report download failed: {0}")]
    Download(#[from] ApiError),
    #[error("backend returned an empty report")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl ReportFormat {
    pub fn path(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "/reports/pdf",
            ReportFormat::Excel => "/reports/excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct ReportService {
    api: Arc<dyn DashboardApi>,
}

impl ReportService {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    pub async fn export(&self, format: ReportFormat, period: &Period) -> Result<Report, ReportError> {
        let bytes = self.api.download_report(format.path(), period).await?;
        if bytes.is_empty() {
            return Err(ReportError::Empty);
        }

        let filename = format!("environment-report-{}.{}", period.slug(), format.extension());
        tracing::info!(%filename, size = bytes.len(), "Report exported");

        Ok(Report {
            filename,
            content_type: format.content_type(),
            bytes,
        })
    }
}
