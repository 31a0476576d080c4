//! Relay configuration
//!
//! Configuration comes from an optional TOML file, then environment
//! variables override individual fields. With neither present the relay
//! targets a local development agent at `http://localhost:8000/run`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Environment variable holding the downstream agent URL
pub const AGENT_RUN_URL_ENV: &str = "AGENT_RUN_URL";
/// Environment variable overriding the listen host
pub const RELAY_HOST_ENV: &str = "RELAY_HOST";
/// Environment variable overriding the listen port
pub const RELAY_PORT_ENV: &str = "RELAY_PORT";

/// Development default for the downstream agent endpoint
pub const DEFAULT_AGENT_RUN_URL: &str = "http://localhost:8000/run";

/// Main relay configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// Downstream agent section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Full URL of the agent's run endpoint
    #[serde(default = "default_run_url")]
    pub run_url: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            run_url: default_run_url(),
        }
    }
}

/// Inbound HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_run_url() -> String {
    DEFAULT_AGENT_RUN_URL.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid agent URL '{url}': {reason}")]
    InvalidAgentUrl { url: String, reason: String },
    #[error("Invalid listen address: {0}")]
    InvalidListenAddress(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RelayConfig {
    /// Load configuration from TOML file, apply environment overrides, validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file(path)?.finish(|name| std::env::var(name).ok())
    }

    /// Read and parse a TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Build configuration from defaults and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().finish(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup and validate the result
    ///
    /// Tests pass a closure over a fixed map instead of touching the
    /// process environment.
    pub fn finish<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_overrides(lookup)?;
        self.validate()?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(AGENT_RUN_URL_ENV) {
            self.agent.run_url = url;
        }
        if let Some(host) = lookup(RELAY_HOST_ENV) {
            self.server.host = host;
        }
        if let Some(port) = lookup(RELAY_PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::InvalidConfig(format!(
                    "{RELAY_PORT_ENV} must be a port number, got '{port}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Validate agent URL and listen address
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_url(&self.agent.run_url)?;
        self.listen_addr()?;
        Ok(())
    }

    /// Socket address the relay binds to
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let candidate = format!("{}:{}", self.server.host, self.server.port);
        candidate
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddress(candidate))
    }
}

/// Validate the downstream agent URL is an absolute http(s) URL
fn validate_agent_url(run_url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(run_url).map_err(|e| ConfigError::InvalidAgentUrl {
        url: run_url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidAgentUrl {
            url: run_url.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}
