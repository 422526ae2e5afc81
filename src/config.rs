use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::Error;

const CONFIG_PATH_VAR: &str = "UPTIME_PRODUCER_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiOptions,
    #[serde(default)]
    pub monitor: MonitorOptions,
}

/// Streaming platform access. Values missing from the file are taken from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct ApiOptions {
    pub url: Option<String>,
    pub auth_token: Option<String>,
    pub project: Option<String>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonitorOptions {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_check_interval_secs() -> u64 {
    30
}

/// Fully resolved platform settings, ready to build a client from.
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub url: Url,
    pub auth_token: String,
    pub project: String,
    pub service: String,
    /// Per-request timeout for platform calls.
    pub timeout: Duration,
}

impl Config {
    /// Loads the configuration from `$UPTIME_PRODUCER_CONFIG` or the user config directory.
    ///
    /// A missing file at the default location yields the defaults, so that a
    /// deployment can be configured through environment variables alone.
    pub fn load() -> Result<Config, Error> {
        if let Ok(path) = dotenvy::var(CONFIG_PATH_VAR) {
            return Self::load_from(path);
        }

        match default_path() {
            Some(path) if path.exists() => Self::load_from(path),
            _ => {
                let mut config = Config::default();
                config.api.fill_from_env();
                Ok(config)
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.api.fill_from_env();
        Ok(config)
    }

    /// Validates the `[api]` section into settings the client can use.
    pub fn platform(&self) -> Result<PlatformSettings, Error> {
        let url = required(self.api.url.as_ref(), "API_URL")?;
        Ok(PlatformSettings {
            url: Url::parse(&url)?,
            auth_token: required(self.api.auth_token.as_ref(), "API_AUTH_TOKEN")?,
            project: required(self.api.project.as_ref(), "PROJECT_NAME")?,
            service: required(self.api.service.as_ref(), "SERVICE_NAME")?,
            timeout: Duration::from_secs(self.monitor.timeout_secs),
        })
    }
}

impl ApiOptions {
    fn fill_from_env(&mut self) {
        fill(&mut self.url, "API_URL");
        fill(&mut self.auth_token, "API_AUTH_TOKEN");
        fill(&mut self.project, "PROJECT_NAME");
        fill(&mut self.service, "SERVICE_NAME");
    }
}

fn fill(slot: &mut Option<String>, var: &str) {
    if slot.is_none() {
        *slot = dotenvy::var(var).ok();
    }
}

fn required(value: Option<&String>, var: &str) -> Result<String, Error> {
    value.cloned().ok_or_else(|| {
        Error::Config(format!(
            "{var} is not set in the config file or the environment"
        ))
    })
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("uptime-producer").join("config.toml"))
}
