//! Typed configuration from environment variables and an optional TOML file.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! The API token is wrapped in secrecy::SecretString to prevent log leaks.
//!
//! Precedence for workflow settings: CLI flags > environment > file > defaults.

pub mod secrets;

use crate::error::{Error, Result};
use crate::scheduler::{DelayRange, SchedulerConfig};
use secrets::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TARGET_STATUS: &str = "to be reviewed";
pub const DEFAULT_FINAL_STATUS: &str = "acknowledged";

#[derive(Debug)]
pub struct Config {
    pub api_token: SecretString,
    pub list_id: String,
    /// Override for the ClickUp API root, e.g. a proxy or a test server.
    pub base_url: Option<String>,
    pub http_timeout: Duration,
    pub workflow: WorkflowConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// The fixed source -> destination status workflow and its timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub target_status: String,
    pub final_status: String,
    pub min_delay_minutes: u64,
    pub max_delay_minutes: u64,
    pub poll_interval_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            target_status: DEFAULT_TARGET_STATUS.to_string(),
            final_status: DEFAULT_FINAL_STATUS.to_string(),
            min_delay_minutes: 1,
            max_delay_minutes: 10,
            poll_interval_secs: 60,
        }
    }
}

/// Top-level TOML wrapper.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    workflow: WorkflowConfig,
}

impl WorkflowConfig {
    /// Read the `[workflow]` table from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad config file {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(content)?;
        Ok(file.workflow)
    }

    /// Overlay any `DEFERACK_*` environment variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = optional_var::<String>("DEFERACK_TARGET_STATUS")? {
            self.target_status = v;
        }
        if let Some(v) = optional_var::<String>("DEFERACK_FINAL_STATUS")? {
            self.final_status = v;
        }
        if let Some(v) = optional_var("DEFERACK_MIN_DELAY_MINUTES")? {
            self.min_delay_minutes = v;
        }
        if let Some(v) = optional_var("DEFERACK_MAX_DELAY_MINUTES")? {
            self.max_delay_minutes = v;
        }
        if let Some(v) = optional_var("DEFERACK_POLL_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_status.trim().is_empty() {
            return Err(Error::Config("target status must not be empty".to_string()));
        }
        if self.final_status.trim().is_empty() {
            return Err(Error::Config("final status must not be empty".to_string()));
        }
        if crate::model::status_eq(&self.target_status, &self.final_status) {
            return Err(Error::Config(format!(
                "target and final status are both {:?}",
                self.target_status
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        self.delay_range().map(|_| ())
    }

    pub fn delay_range(&self) -> Result<DelayRange> {
        DelayRange::new(
            Duration::from_secs(self.min_delay_minutes * 60),
            Duration::from_secs(self.max_delay_minutes * 60),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Build the scheduler parameters, validating first.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        self.validate()?;
        Ok(SchedulerConfig {
            target_status: self.target_status.clone(),
            final_status: self.final_status.clone(),
            delay: self.delay_range()?,
            poll_interval: self.poll_interval(),
        })
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load the workflow from `file` (if any), then overlay the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut workflow = match file {
            Some(path) => WorkflowConfig::from_toml_file(path)?,
            None => WorkflowConfig::default(),
        };
        workflow.apply_env()?;
        workflow.validate()?;

        let list_id = required_var("CLICKUP_LIST_ID")?;
        if list_id.trim().is_empty() {
            return Err(Error::Config("CLICKUP_LIST_ID is empty".to_string()));
        }

        Ok(Self {
            api_token: SecretString::from(required_var("CLICKUP_API_TOKEN")?),
            list_id,
            base_url: std::env::var("CLICKUP_BASE_URL").ok(),
            http_timeout: Duration::from_secs(
                optional_var("DEFERACK_HTTP_TIMEOUT_SECS")?.unwrap_or(30),
            ),
            workflow,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid value for {name} ({raw:?}): {e}"))),
        Err(_) => Ok(None),
    }
}
