// Application state for HTTP handlers
use crate::application::refresh_coordinator::RefreshCoordinator;
use crate::application::report_service::ReportService;
use crate::presentation::view_store::ViewStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RefreshCoordinator>,
    pub store: Arc<ViewStore>,
    pub reports: ReportService,
}
