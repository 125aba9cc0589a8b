use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_URL: &str = "http://localhost:6565";
pub const DEFAULT_REFRESH_SECS: f64 = 1.0;
pub const DEFAULT_VU_STEP: i64 = 1;
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "K6CTL_CONFIG";

const CONFIG_NAMES: [&str; 4] = ["k6ctl.yml", "k6ctl.yaml", ".k6ctl.yml", ".k6ctl.yaml"];

/// One configuration layer. Every field is optional so layers can be
/// stacked: config file first, then command-line flags on top.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    /// Base URL of the k6 REST API
    #[serde(default)]
    pub url: Option<String>,

    /// Seconds between polls
    #[serde(default)]
    pub refresh_interval: Option<f64>,

    /// VUs added or removed per `+`/`-` key press
    #[serde(default)]
    pub vu_step: Option<i64>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout: Option<f64>,

    /// Show the message strip along the bottom
    #[serde(default)]
    pub debug_panel: Option<bool>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    /// Parse a layer from YAML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml { path: None, source })
    }

    /// Search for a config file: `K6CTL_CONFIG` first, then the known file
    /// names in `start_dir` and each of its parents. `Ok(None)` when
    /// nothing is found.
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::discover_from(env_path, start_dir)
    }

    /// [`ConfigLayer::discover`] with the environment already read. An
    /// explicit path that does not exist is an error, not a fallback.
    fn discover_from(
        env_path: Option<PathBuf>,
        start_dir: &Path,
    ) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = env_path {
            if path.exists() {
                let layer = Self::load(&path)?;
                return Ok(Some((path, layer)));
            }
            return Err(ConfigError::NotFound { path });
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &CONFIG_NAMES {
                let path = current.join(name);
                if path.exists() {
                    let layer = Self::load(&path)?;
                    return Ok(Some((path, layer)));
                }
            }
            dir = current.parent();
        }
        Ok(None)
    }

    /// `other` on top of `self`: fields set in `other` win
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            url: other.url.or(self.url),
            refresh_interval: other.refresh_interval.or(self.refresh_interval),
            vu_step: other.vu_step.or(self.vu_step),
            request_timeout: other.request_timeout.or(self.request_timeout),
            debug_panel: other.debug_panel.or(self.debug_panel),
        }
    }
}

/// Resolved settings, built once at startup and shared by reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL without a trailing slash
    pub base_url: String,
    pub refresh_interval: Duration,
    pub vu_step: i64,
    pub request_timeout: Duration,
    pub show_debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            refresh_interval: Duration::from_secs_f64(DEFAULT_REFRESH_SECS),
            vu_step: DEFAULT_VU_STEP,
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            show_debug: true,
        }
    }
}

impl Config {
    /// Apply defaults to a (merged) layer and validate the result
    pub fn resolve(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let base_url = validate_url(layer.url.as_deref().unwrap_or(DEFAULT_URL))?;
        let refresh_interval = positive_secs(
            "refresh_interval",
            layer.refresh_interval.unwrap_or(DEFAULT_REFRESH_SECS),
        )?;
        let request_timeout = positive_secs(
            "request_timeout",
            layer.request_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )?;

        let vu_step = layer.vu_step.unwrap_or(DEFAULT_VU_STEP);
        if vu_step < 1 {
            return Err(ConfigError::Invalid {
                field: "vu_step",
                reason: format!("must be at least 1, got {}", vu_step),
            });
        }

        Ok(Self {
            base_url,
            refresh_interval,
            vu_step,
            request_timeout,
            show_debug: layer.debug_panel.unwrap_or(true),
        })
    }
}

fn validate_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ConfigError::Invalid {
            field: "url",
            reason: format!("expected http(s)://host[:port], got '{}'", url),
        });
    }
    Ok(trimmed.to_string())
}

fn positive_secs(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive number of seconds, got {}", secs),
        });
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error{}: {source}", location(.path))]
    Yaml {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}
