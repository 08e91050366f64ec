//! Application-level configuration loading, including the admin secret and
//! the sweeper intervals.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LOCKED_DUNGEON_CONFIG_PATH";
/// Environment variable that overrides the configured admin password.
const ADMIN_PASSWORD_ENV: &str = "LOCKED_DUNGEON_ADMIN_PASSWORD";
/// Placeholder secret used when nothing else is configured.
const DEFAULT_ADMIN_PASSWORD: &str = "dungeon-admin";

const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;
const DEFAULT_IDLE_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Shared admin secret checked on every privileged login.
    pub admin_password: String,
    /// How often the liveness probe pings every open connection.
    pub probe_interval: Duration,
    /// How often the idle sweeper scans for stale sessions.
    pub idle_sweep_interval: Duration,
    /// Age of `last_activity` past which a session is evicted.
    pub idle_timeout: Duration,
    /// How long a 2FA approval request may stay unanswered.
    pub approval_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults, then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Ok(password) = env::var(ADMIN_PASSWORD_ENV) {
            config.admin_password = password;
        }

        if config.admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("admin password is the built-in default; set {ADMIN_PASSWORD_ENV}");
        }

        config
    }

    /// Check a candidate secret against the configured admin password.
    pub fn verify_password(&self, candidate: &str) -> bool {
        self.admin_password == candidate
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            idle_sweep_interval: Duration::from_secs(DEFAULT_IDLE_SWEEP_INTERVAL_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            approval_timeout: Duration::from_secs(DEFAULT_APPROVAL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_password: Option<String>,
    probe_interval_secs: Option<u64>,
    idle_sweep_interval_secs: Option<u64>,
    idle_timeout_secs: Option<u64>,
    approval_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            admin_password: value.admin_password.unwrap_or(defaults.admin_password),
            probe_interval: value
                .probe_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_interval),
            idle_sweep_interval: value
                .idle_sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_sweep_interval),
            idle_timeout: value
                .idle_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            approval_timeout: value
                .approval_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.approval_timeout),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recommended_intervals() {
        let config = AppConfig::default();
        assert_eq!(config.probe_interval, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.approval_timeout, Duration::from_secs(120));
    }

    #[test]
    fn raw_config_overrides_only_present_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"adminPassword":"s3cret","probeIntervalSecs":5}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.admin_password, "s3cret");
        assert_eq!(config.probe_interval, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn verify_password_is_exact_match() {
        let config = AppConfig {
            admin_password: "s3cret".into(),
            ..AppConfig::default()
        };
        assert!(config.verify_password("s3cret"));
        assert!(!config.verify_password("S3cret"));
        assert!(!config.verify_password(""));
    }
}
