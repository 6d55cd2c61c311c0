use crate::domain::measurement::Thresholds;
use crate::domain::period::{Period, PeriodError};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Point cap window the backend accepts for `/api/series`
pub const MAX_POINTS_RANGE: std::ops::RangeInclusive<usize> = 5..=2000;
/// Record limit window the backend accepts for `/api/violations`
pub const VIOLATIONS_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("retry.max_attempts must be at least 1")]
    NoAttempts,
    #[error("refresh.interval_secs must be greater than zero")]
    ZeroInterval,
    #[error("refresh.max_points must be within 5..=2000, got {0}")]
    MaxPointsOutOfRange(usize),
    #[error("refresh.default_days: {0}")]
    DefaultPeriod(#[from] PeriodError),
    #[error("thresholds.temp_low must be below thresholds.temp_high")]
    InvertedThresholds,
    #[error("invalid server.bind address {0:?}")]
    Bind(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub api: ApiSettings,
    pub retry: RetrySettings,
    pub refresh: RefreshSettings,
    pub thresholds: Thresholds,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    /// Path prefix of the JSON resources
    pub prefix: String,
    /// Append a `_=<millis>` parameter to every GET
    pub cache_bust: bool,
    /// The backend's routes end in `/` (e.g. `/api/summary/`)
    pub trailing_slash: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub default_days: u32,
    pub max_points: usize,
    pub violations_limit: u32,
    pub prediction_hours: u32,
    pub analytics_ttl_secs: u64,
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn analytics_ttl(&self) -> Duration {
        Duration::from_secs(self.analytics_ttl_secs)
    }

    pub fn default_period(&self) -> Result<Period, PeriodError> {
        Period::days(self.default_days)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.bind.clone()))
    }
}

impl DashboardConfig {
    /// Check cross-field constraints and clamp soft limits into the backend's window
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if !MAX_POINTS_RANGE.contains(&self.refresh.max_points) {
            return Err(ConfigError::MaxPointsOutOfRange(self.refresh.max_points));
        }
        if self.thresholds.temp_low >= self.thresholds.temp_high {
            return Err(ConfigError::InvertedThresholds);
        }
        self.refresh.default_period()?;
        self.server.socket_addr()?;

        let limit = self.refresh.violations_limit.clamp(
            *VIOLATIONS_LIMIT_RANGE.start(),
            *VIOLATIONS_LIMIT_RANGE.end(),
        );
        if limit != self.refresh.violations_limit {
            tracing::warn!(
                configured = self.refresh.violations_limit,
                clamped = limit,
                "refresh.violations_limit outside backend window"
            );
            self.refresh.violations_limit = limit;
        }
        self.api.base_url = self.api.base_url.trim_end_matches('/').to_string();

        Ok(self)
    }
}

fn with_defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    let thresholds = Thresholds::default();
    Ok(config::Config::builder()
        .set_default("api.base_url", "http://127.0.0.1:8000")?
        .set_default("api.prefix", "/api")?
        .set_default("api.cache_bust", true)?
        .set_default("api.trailing_slash", false)?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.base_delay_ms", 1000)?
        .set_default("refresh.interval_secs", 60)?
        .set_default("refresh.default_days", 7)?
        .set_default("refresh.max_points", 1000)?
        .set_default("refresh.violations_limit", 20)?
        .set_default("refresh.prediction_hours", 24)?
        .set_default("refresh.analytics_ttl_secs", 300)?
        .set_default("thresholds.temp_low", thresholds.temp_low)?
        .set_default("thresholds.temp_high", thresholds.temp_high)?
        .set_default("thresholds.rh_limit", thresholds.rh_limit)?
        .set_default("server.bind", "127.0.0.1:8088")?)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("DASHBOARD")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<DashboardConfig> {
    let config: DashboardConfig = builder.build()?.try_deserialize()?;
    Ok(config.validated()?)
}

/// Load `config/dashboard.toml` (optional) overlaid with `DASHBOARD__*` variables
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    finish(
        with_defaults()?
            .add_source(config::File::with_name("config/dashboard").required(false))
            .add_source(environment()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_str(toml: &str) -> anyhow::Result<DashboardConfig> {
        finish(with_defaults()?.add_source(config::File::from_str(toml, config::FileFormat::Toml)))
    }

    #[test]
    fn test_defaults() {
        let config = load_str("").unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay(), Duration::from_secs(1));
        assert_eq!(config.refresh.interval(), Duration::from_secs(60));
        assert_eq!(config.refresh.default_period().unwrap(), Period::days(7).unwrap());
        assert_eq!(config.thresholds, Thresholds::default());
        assert!(config.api.cache_bust);
    }

    #[test]
    fn test_file_overrides() {
        let config = load_str(
            r#"
            [api]
            base_url = "http://monitor.local:8000/"
            trailing_slash = true

            [refresh]
            interval_secs = 30
            default_days = 30
            violations_limit = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://monitor.local:8000");
        assert!(config.api.trailing_slash);
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.refresh.violations_limit, 100);
    }

    #[test]
    fn test_environment_overrides() {
        let mut vars = HashMap::new();
        vars.insert("DASHBOARD__RETRY__MAX_ATTEMPTS".to_string(), "5".to_string());
        vars.insert("DASHBOARD__SERVER__BIND".to_string(), "0.0.0.0:9000".to_string());

        let config = finish(
            with_defaults()
                .unwrap()
                .add_source(environment().source(Some(vars))),
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.server.socket_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_validation_failures() {
        assert!(load_str("[retry]\nmax_attempts = 0").is_err());
        assert!(load_str("[refresh]\ninterval_secs = 0").is_err());
        assert!(load_str("[refresh]\nmax_points = 3").is_err());
        assert!(load_str("[refresh]\ndefault_days = 14").is_err());
        assert!(load_str("[thresholds]\ntemp_low = 20.0").is_err());
        assert!(load_str("[server]\nbind = \"nowhere\"").is_err());
    }
}
