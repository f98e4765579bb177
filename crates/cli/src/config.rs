// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespaced process configuration (spec §6), assembled from a TOML file
//! with a handful of environment-variable overrides. Loading itself is a
//! named non-goal (spec.md §1); this struct is the thin, concrete shape
//! the rest of the workspace is constructed from, the way the teacher's
//! `daemon::lifecycle::Config` gives paths a home.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use xport_core::{ErrorKind, XportError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraktConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub extended_info: bool,
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base_url: "https://api.trakt.tv".to_string(),
            extended_info: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterboxdConfig {
    pub export_dir: PathBuf,
    pub watched_filename: String,
    pub ratings_filename: String,
    pub watchlist_filename: String,
}

impl Default for LetterboxdConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("./export"),
            watched_filename: "watched.csv".to_string(),
            ratings_filename: "ratings.csv".to_string(),
            watchlist_filename: "watchlist.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    Aggregated,
    Individual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: String,
    pub date_format: String,
    pub timezone: String,
    pub history_mode: HistoryMode,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            timezone: "UTC".to_string(),
            history_mode: HistoryMode::Aggregated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub format: String,
    pub output: String,
    pub rotation_enabled: bool,
    pub max_age_days: u32,
    pub max_size_mb: u32,
    pub max_backups: u32,
    pub correlation_id: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "visual".to_string(),
            output: "stdout".to_string(),
            rotation_enabled: false,
            max_age_days: 14,
            max_size_mb: 100,
            max_backups: 5,
            correlation_id: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nConfig {
    pub default_language: String,
    pub language: String,
    pub locales_dir: PathBuf,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            language: "en".to_string(),
            locales_dir: PathBuf::from("./locales"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub redirect_uri: String,
    pub callback_port: u16,
    pub use_oauth: bool,
    pub auto_refresh: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_uri: "http://localhost:8765/callback".to_string(),
            callback_port: 8765,
            use_oauth: false,
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    pub health_checks_enabled: bool,
    pub metrics_port: u16,
    pub metrics_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_enabled: true,
            tracing_enabled: true,
            health_checks_enabled: true,
            metrics_port: 9090,
            metrics_path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyringBackendKind {
    Os,
    Env,
    EncryptedFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub require_https: bool,
    pub encryption_enabled: bool,
    pub audit_logging: bool,
    pub keyring_backend: KeyringBackendKind,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_https: true,
            encryption_enabled: true,
            audit_logging: true,
            keyring_backend: KeyringBackendKind::Os,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLimit {
    pub requests_per_minute: f64,
    pub burst_capacity: f64,
    pub window_secs: u64,
}

impl Default for ServiceLimit {
    fn default() -> Self {
        Self { requests_per_minute: 60.0, burst_capacity: 10.0, window_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub default_limit: f64,
    pub burst_limit: f64,
    pub limits: HashMap<String, ServiceLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { enabled: true, default_limit: 1.0, burst_limit: 10.0, limits: HashMap::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trakt: TraktConfig,
    pub letterboxd: LetterboxdConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub i18n: I18nConfig,
    pub auth: AuthConfig,
    pub monitoring: MonitoringConfig,
    pub security: SecurityConfig,
    #[serde(rename = "rateLimit")]
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Loads from `path` if it exists, otherwise starts from defaults,
    /// then applies the small fixed set of environment overrides named in
    /// spec.md §6.
    pub fn load(path: Option<&Path>) -> Result<Self, XportError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, XportError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            XportError::new(ErrorKind::ConfigError, format!("failed to read config file {}", path.display())).with_cause(e)
        })?;
        toml::from_str(&text).map_err(|e| {
            XportError::new(ErrorKind::ConfigError, format!("invalid config file {}", path.display())).with_cause(e)
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(lang) = std::env::var("I18N_LANGUAGE") {
            self.i18n.language = lang;
        }
        if let Ok(quiet) = std::env::var("EXPORT_QUIET_MODE") {
            if is_truthy(&quiet) {
                self.logging.output = "file".to_string();
            }
        }
        if let Ok(enabled) = std::env::var("MONITORING_ENABLED") {
            self.monitoring.enabled = is_truthy(&enabled);
        }
        // ENCRYPTION_KEY is read directly by the keyring's encrypted-file
        // backend; it is deliberately not copied into `Config` or `Debug`
        // output (spec.md §4.10, §6).
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
