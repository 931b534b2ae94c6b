//! Configuration system for Volley.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $VOLLEY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/volley/config.toml
//!   3. ~/.config/volley/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::{Convergence, WaitPolicy};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    pub controller: ControllerConfig,
    pub wait: WaitConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL of the OTG controller, e.g. https://clab-ceos-ixia-c:8443
    pub location: String,
    /// Lab controllers usually present self-signed certificates.
    pub verify_tls: bool,
    /// Whole-request timeout. Must be non-zero.
    pub request_timeout_secs: u64,
    /// TCP/TLS connect timeout. Must be non-zero.
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Used after `start traffic`.
    pub traffic: WaitPolicy,
    /// Used after `start protocol`.
    pub protocol: WaitPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format {other:?} (expected table|json)")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            location: "https://localhost:8443".to_string(),
            verify_tls: false,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            traffic: WaitPolicy::Fixed { delay_secs: 10 },
            protocol: WaitPolicy::Poll {
                interval_ms: 1000,
                timeout_secs: 60,
                until: Convergence::PeersUp,
            },
        }
    }
}

impl ControllerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("volley")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl VolleyConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            VolleyConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("VOLLEY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = VolleyConfig::default().to_toml()?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }

    /// Timeouts bound every remote call, so none may be zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.location.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "controller.location",
                "must not be empty".to_string(),
            ));
        }
        if self.controller.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "controller.request_timeout_secs",
                "must be greater than 0".to_string(),
            ));
        }
        if self.controller.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "controller.connect_timeout_secs",
                "must be greater than 0".to_string(),
            ));
        }
        self.wait
            .traffic
            .validate()
            .map_err(|e| ConfigError::Invalid("wait.traffic", e))?;
        self.wait
            .protocol
            .validate()
            .map_err(|e| ConfigError::Invalid("wait.protocol", e))?;
        Ok(())
    }

    /// Apply VOLLEY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VOLLEY_CONTROLLER__LOCATION") {
            self.controller.location = v;
        }
        if let Ok(v) = std::env::var("VOLLEY_CONTROLLER__VERIFY_TLS") {
            self.controller.verify_tls = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("VOLLEY_CONTROLLER__REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.controller.request_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("VOLLEY_OUTPUT__FORMAT") {
            if let Ok(format) = v.parse() {
                self.output.format = format;
            }
        }
    }
}
