// HTTP request handlers
use crate::application::refresh_coordinator::{CycleOutcome, RefreshState, Trigger};
use crate::application::report_service::{ReportError, ReportFormat};
use crate::domain::period::{Period, PeriodError, PeriodRequest};
use crate::presentation::app_state::AppState;
use crate::presentation::view_store::{DashboardView, ViewEvent};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

pub const NDJSON: &str = "application/x-ndjson";

/// Error body returned by every failing handler
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PeriodError> for HttpError {
    fn from(e: PeriodError) -> Self {
        HttpError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
}

impl From<ReportError> for HttpError {
    fn from(e: ReportError) -> Self {
        let status = match e {
            ReportError::UnknownFormat(_) => StatusCode::BAD_REQUEST,
            ReportError::Download(_) | ReportError::Empty => StatusCode::BAD_GATEWAY,
        };
        HttpError::new(status, e.to_string())
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current dashboard view, as last applied
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.store.current())
}

/// Refresh lifecycle events, one JSON object per line
pub async fn stream_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut rx = state.store.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => match ndjson_line(&event) {
                    Ok(line) => {
                        yield Ok::<Bytes, std::io::Error>(line);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unserializable view event");
                    }
                },
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    ([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(stream))
}

fn ndjson_line(event: &ViewEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Select the reporting period; the refresh loop picks it up immediately
pub async fn put_period(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PeriodRequest>,
) -> Result<(StatusCode, Json<RefreshState>), HttpError> {
    let period = Period::try_from(request)?;
    let changed = state.coordinator.set_period(period);
    let status = if changed {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(state.coordinator.state())))
}

fn outcome_response(outcome: CycleOutcome) -> (StatusCode, Json<CycleOutcome>) {
    let status = match outcome {
        CycleOutcome::Applied { .. } => StatusCode::OK,
        CycleOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        CycleOutcome::Skipped { .. } => StatusCode::CONFLICT,
    };
    (status, Json(outcome))
}

/// Manual refresh
pub async fn post_refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    outcome_response(state.coordinator.refresh(Trigger::Manual).await)
}

/// Ask the backend to run one monitoring cycle, then refresh
pub async fn post_force_cycle(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    outcome_response(state.coordinator.force_cycle().await)
}

pub async fn delete_notification(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.store.dismiss(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportQuery {
    /// Explicit period from the query string, if any
    fn period(&self) -> Result<Option<Period>, HttpError> {
        match (self.days, self.start_date, self.end_date) {
            (None, None, None) => Ok(None),
            (Some(days), None, None) => Ok(Some(Period::days(days)?)),
            (None, Some(start), Some(end)) => Ok(Some(Period::custom(start, end)?)),
            _ => Err(HttpError::new(
                StatusCode::BAD_REQUEST,
                "pass either days or both start_date and end_date",
            )),
        }
    }
}

/// Download a PDF or Excel report, defaulting to the selected period
pub async fn get_report(
    Path(format): Path<String>,
    Query(query): Query<ReportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let format: ReportFormat = format.parse()?;
    let period = match query.period()? {
        Some(period) => period,
        None => state.coordinator.state().current_period,
    };

    let report = state.reports.export(format, &period).await.map_err(|e| {
        tracing::error!(error = %e, %period, "Report export failed");
        HttpError::from(e)
    })?;

    let headers = [
        (header::CONTENT_TYPE, report.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.filename),
        ),
    ];
    Ok((headers, report.bytes))
}
