//! Process-wide client configuration.
//!
//! Built once at startup (normally from environment variables) and passed
//! explicitly to everything that needs it.

use std::path::PathBuf;
use std::time::Duration;

use medstock_observability::LogFormat;
use thiserror::Error;

pub const ENV_API_URL: &str = "MEDSTOCK_API_URL";
pub const ENV_AUTH_TOKEN: &str = "MEDSTOCK_AUTH_TOKEN";
pub const ENV_TOKEN_FILE: &str = "MEDSTOCK_TOKEN_FILE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "MEDSTOCK_HTTP_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_SECS: &str = "MEDSTOCK_POLL_INTERVAL_SECS";
pub const ENV_NOTIFY_EXPIRY: &str = "MEDSTOCK_NOTIFY_EXPIRY";
pub const ENV_NOTIFY_QUARANTINE: &str = "MEDSTOCK_NOTIFY_QUARANTINE";
pub const ENV_LOG_FORMAT: &str = "MEDSTOCK_LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which dashboard notifications the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPreferences {
    pub expiry_alerts: bool,
    pub quarantine_alerts: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            expiry_alerts: true,
            quarantine_alerts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub notifications: NotificationPreferences,
    /// Token supplied by the environment; takes precedence over the token file.
    pub auth_token: Option<String>,
    /// Where `login` persists the bearer token.
    pub token_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            notifications: NotificationPreferences::default(),
            auth_token: None,
            token_path: default_token_path(),
            log_format: LogFormat::Json,
        }
    }
}

/// `<config dir>/medstock/token`.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("medstock").join("token"))
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = normalize_api_url(&url)?;
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS) {
            config.request_timeout = parse_secs(ENV_HTTP_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = get(ENV_POLL_INTERVAL_SECS) {
            config.poll_interval = parse_secs(ENV_POLL_INTERVAL_SECS, &secs)?;
        }
        if let Some(flag) = get(ENV_NOTIFY_EXPIRY) {
            config.notifications.expiry_alerts = parse_bool(ENV_NOTIFY_EXPIRY, &flag)?;
        }
        if let Some(flag) = get(ENV_NOTIFY_QUARANTINE) {
            config.notifications.quarantine_alerts = parse_bool(ENV_NOTIFY_QUARANTINE, &flag)?;
        }
        if let Some(path) = get(ENV_TOKEN_FILE) {
            config.token_path = Some(PathBuf::from(path));
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            config.log_format = LogFormat::parse(&format);
        }
        config.auth_token = get(ENV_AUTH_TOKEN).map(|t| t.trim().to_string());

        Ok(config)
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(url)?;
        Ok(self)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: ENV_API_URL,
        value: raw.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_secs(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "must be at least 1 second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.notifications, NotificationPreferences::default());
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn reads_every_setting() {
        let config = config_from(&[
            (ENV_API_URL, "https://pharmacy.example.org/api/"),
            (ENV_AUTH_TOKEN, " abc123 "),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
            (ENV_POLL_INTERVAL_SECS, "15"),
            (ENV_NOTIFY_EXPIRY, "off"),
            (ENV_NOTIFY_QUARANTINE, "yes"),
            (ENV_TOKEN_FILE, "/tmp/medstock-token"),
            (ENV_LOG_FORMAT, "pretty"),
        ])
        .unwrap();

        assert_eq!(config.api_url, "https://pharmacy.example.org/api");
        assert_eq!(config.auth_token.as_deref(), Some("abc123"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert!(!config.notifications.expiry_alerts);
        assert!(config.notifications.quarantine_alerts);
        assert_eq!(config.token_path, Some(PathBuf::from("/tmp/medstock-token")));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[(ENV_API_URL, "ftp://example.org")]),
            Err(ConfigError::InvalidValue { key: ENV_API_URL, .. })
        ));
        assert!(config_from(&[(ENV_API_URL, "not a url")]).is_err());
        assert!(config_from(&[(ENV_POLL_INTERVAL_SECS, "0")]).is_err());
        assert!(config_from(&[(ENV_HTTP_TIMEOUT_SECS, "soon")]).is_err());
        assert!(config_from(&[(ENV_NOTIFY_EXPIRY, "maybe")]).is_err());
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_from(&[(ENV_AUTH_TOKEN, "  "), (ENV_API_URL, "")]).unwrap();
        assert!(config.auth_token.is_none());
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
