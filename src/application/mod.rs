// Application layer - backend API seam, refresh orchestration and services
pub mod analytics_service;
pub mod dashboard_api;
pub mod refresh_coordinator;
pub mod report_service;
pub mod view_sink;

#[cfg(test)]
pub mod test_support;
