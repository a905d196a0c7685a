//! Configuration module
//!
//! TOML file (default `~/.config/crossing-monitor/config.toml`) with
//! `MONITOR_*` environment overrides applied on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::activity::InactivityConfig;
use crate::application::realtime::ReconnectPolicy;
use crate::domain::{ClientError, ClientResult};

pub const CONFIG_ENV: &str = "MONITOR_CONFIG";

/// `~/.config/crossing-monitor/config.toml`, or `$MONITOR_CONFIG` when set.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crossing-monitor")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub realtime: RealtimeConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub app: AppInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub auto_logout_minutes: u64,
    /// Session file; the user config dir is used when unset.
    pub storage_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_logout_minutes: 30,
            storage_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Falls back to `api.base_url`.
    pub url: Option<String>,
    pub path: String,
    pub reconnect_delay_ms: u64,
    pub reconnect_delay_max_ms: u64,
    pub max_reconnect_attempts: u32,
    pub connect_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: "/socket".to_string(),
            reconnect_delay_ms: 1000,
            reconnect_delay_max_ms: 5000,
            max_reconnect_attempts: 5,
            connect_timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub login_max_requests: usize,
    pub login_window_ms: u64,
    pub api_max_requests: usize,
    pub api_window_ms: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_max_requests: 5,
            login_window_ms: 60_000,
            api_max_requests: 100,
            api_window_ms: 60_000,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub debug: bool,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub version: String,
    pub environment: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    /// Read `path`, apply environment overrides and validate.
    ///
    /// A missing file yields the defaults plus overrides.
    pub fn load(path: &Path) -> ClientResult<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(ClientError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> ClientResult<Self> {
        toml::from_str(raw).map_err(|e| ClientError::Config(format!("invalid config: {}", e)))
    }

    /// Apply `MONITOR_*` overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MONITOR_API_URL") {
            self.api.base_url = url;
        }
        if let Some(ms) = lookup("MONITOR_API_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.api.timeout_ms = ms;
        }
        if let Some(min) = lookup("MONITOR_AUTO_LOGOUT_MINUTES").and_then(|v| v.parse().ok()) {
            self.session.auto_logout_minutes = min;
        }
        if let Some(flag) = lookup("MONITOR_ENABLE_DEBUG") {
            self.logging.debug = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(version) = lookup("MONITOR_APP_VERSION") {
            self.app.version = version;
        }
        if let Some(env) = lookup("MONITOR_APP_ENV") {
            self.app.environment = env;
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("api.base_url is required".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "api.base_url must be http(s), got '{}'",
                base
            )));
        }
        if self.api.timeout_ms == 0 {
            return Err(ClientError::Config("api.timeout_ms must be positive".into()));
        }
        if self.session.auto_logout_minutes == 0 {
            return Err(ClientError::Config(
                "session.auto_logout_minutes must be positive".into(),
            ));
        }
        if self.realtime.reconnect_delay_max_ms < self.realtime.reconnect_delay_ms {
            return Err(ClientError::Config(
                "realtime.reconnect_delay_max_ms is below reconnect_delay_ms".into(),
            ));
        }
        if self.rate_limit.login_max_requests == 0 || self.rate_limit.api_max_requests == 0 {
            return Err(ClientError::Config(
                "rate_limit max requests must be positive".into(),
            ));
        }
        Ok(())
    }

    // ── Derived settings ────────────────────────────────────────

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn realtime_url(&self) -> &str {
        self.realtime.url.as_deref().unwrap_or(&self.api.base_url)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.realtime.reconnect_delay_ms),
            max_delay: Duration::from_millis(self.realtime.reconnect_delay_max_ms),
            max_attempts: self.realtime.max_reconnect_attempts,
            connect_timeout: Duration::from_millis(self.realtime.connect_timeout_ms),
            ..ReconnectPolicy::default()
        }
    }

    pub fn inactivity(&self) -> InactivityConfig {
        InactivityConfig::from_minutes(self.session.auto_logout_minutes)
    }

    /// Directive used when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> &str {
        if self.logging.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_directive()));

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.session.auto_logout_minutes, 30);
        assert_eq!(config.realtime.path, "/socket");
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
        assert_eq!(config.realtime_url(), "http://localhost:3000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [api]
            base_url = "https://monitor.rail.cl"

            [realtime]
            url = "wss://push.rail.cl"
            max_reconnect_attempts = 2

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://monitor.rail.cl");
        assert_eq!(config.api.timeout_ms, 30_000);
        assert_eq!(config.realtime_url(), "wss://push.rail.cl");
        assert_eq!(config.reconnect_policy().max_attempts, 2);
        assert_eq!(config.rate_limit.login_max_requests, 5);
        assert!(config.logging.json);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("MONITOR_API_URL", "https://staging.rail.cl"),
            ("MONITOR_API_TIMEOUT", "5000"),
            ("MONITOR_AUTO_LOGOUT_MINUTES", "1"),
            ("MONITOR_ENABLE_DEBUG", "true"),
            ("MONITOR_APP_ENV", "staging"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://staging.rail.cl");
        assert_eq!(config.api_timeout(), Duration::from_millis(5000));
        assert_eq!(config.inactivity().timeout, Duration::from_secs(60));
        assert_eq!(config.log_directive(), "debug");
        assert_eq!(config.app.environment, "staging");
    }

    #[test]
    fn unparsable_numbers_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| {
            (key == "MONITOR_API_TIMEOUT").then(|| "soon".to_string())
        });
        assert_eq!(config.api.timeout_ms, 30_000);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.api.base_url = "  ".into();
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        let mut config = AppConfig::default();
        config.api.base_url = "ftp://rail.cl".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.session.auto_logout_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            AppConfig::from_toml("[api\nbase_url ="),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.rate_limit.api_window_ms, 60_000);
    }
}
