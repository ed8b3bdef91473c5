use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "METO_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub past_days: Option<u32>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub window_hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: Option<HttpConfig>,
    pub database: Option<DatabaseConfig>,
    pub upstream: Option<UpstreamConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from METO_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(path)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Get HTTP bind address (default 0.0.0.0:8000)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
    }

    /// Get database URL (default sqlite://weather.db)
    pub fn database_url(&self) -> String {
        self.database
            .as_ref()
            .and_then(|d| d.url.clone())
            .unwrap_or_else(|| "sqlite://weather.db".to_string())
    }

    pub fn database_max_connections(&self) -> u32 {
        self.database
            .as_ref()
            .and_then(|d| d.max_connections)
            .unwrap_or(5)
    }

    pub fn upstream_base_url(&self) -> String {
        self.upstream
            .as_ref()
            .and_then(|u| u.base_url.clone())
            .unwrap_or_else(|| "https://api.open-meteo.com/v1/forecast".to_string())
    }

    /// Bound on a single upstream request, seconds
    pub fn upstream_timeout_secs(&self) -> u64 {
        self.upstream
            .as_ref()
            .and_then(|u| u.timeout_secs)
            .unwrap_or(30)
    }

    pub fn upstream_past_days(&self) -> u32 {
        self.upstream
            .as_ref()
            .and_then(|u| u.past_days)
            .unwrap_or(2)
    }

    pub fn upstream_timezone(&self) -> String {
        self.upstream
            .as_ref()
            .and_then(|u| u.timezone.clone())
            .unwrap_or_else(|| "UTC".to_string())
    }

    pub fn report_window_hours(&self) -> u32 {
        self.report
            .as_ref()
            .and_then(|r| r.window_hours)
            .unwrap_or(48)
    }
}
