//! Runtime configuration: defaults, then `hunter.ron`, then environment and
//! command-line overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hunter_client::{
    ClientSettings, MonitorSettings, PollSettings, RetrySchedule, DEFAULT_BASE_URL,
};
use hunter_core::DUPLICATE_REQUEST_WINDOW;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "hunter.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: Option<u32>,
    pub poll_max_duration_secs: Option<u64>,
    pub refresh_delay_ms: u64,
    pub duplicate_window_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_step_ms: u64,
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let retry = RetrySchedule::default();
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: client.connect_timeout.as_millis() as u64,
            request_timeout_ms: client.request_timeout.as_millis() as u64,
            poll_interval_ms: PollSettings::default().interval.as_millis() as u64,
            poll_max_attempts: None,
            poll_max_duration_secs: None,
            refresh_delay_ms: 1000,
            duplicate_window_ms: DUPLICATE_REQUEST_WINDOW.as_millis() as u64,
            retry_max_attempts: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
            retry_step_ms: retry.step.as_millis() as u64,
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl AppConfig {
    /// Loads `explicit` (which must exist) or `hunter.ron` in `working_dir`
    /// (optional); missing keys keep their defaults.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (working_dir.join(CONFIG_FILENAME), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::from_ron(&text, &path)
    }

    pub fn from_ron(text: &str, path: &Path) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Environment and flags win over the file.
    pub fn apply_overrides(&mut self, api_url: Option<&str>) {
        if let Some(url) = api_url.map(str::trim).filter(|url| !url.is_empty()) {
            self.api_base_url = url.to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        if self.poll_max_attempts == Some(0) {
            return Err(invalid("poll_max_attempts", "must be at least 1 when set"));
        }
        if self.retry_max_attempts == 0 {
            return Err(invalid("retry_max_attempts", "must be at least 1"));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "timeouts must be greater than zero"));
        }
        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            client: ClientSettings {
                base_url: self.api_base_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                ..ClientSettings::default()
            },
            poll: PollSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.poll_max_attempts,
                max_duration: self.poll_max_duration_secs.map(Duration::from_secs),
            },
            retry: RetrySchedule {
                max_attempts: self.retry_max_attempts,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                step: Duration::from_millis(self.retry_step_ms),
            },
        }
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_millis(self.duplicate_window_ms)
    }

    /// Relative export directories resolve against `working_dir`.
    pub fn export_dir(&self, working_dir: &Path) -> PathBuf {
        if self.export_dir.is_absolute() {
            self.export_dir.clone()
        } else {
            working_dir.join(&self.export_dir)
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
