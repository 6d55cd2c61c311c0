// Domain layer - periods, readings, snapshots and analytics reports
pub mod analytics;
pub mod measurement;
pub mod period;
pub mod snapshot;
