//! Runtime settings read from the environment.

use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Default control-plane address.
pub const DEFAULT_DOCKER_HOST: &str = "tcp://127.0.0.1:2375";

/// Default Engine API version.
pub const DEFAULT_API_VERSION: &str = "1.24";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// HTTP base URL of the daemon, without a trailing slash.
    pub base_url: String,
    /// Engine API version used in request paths.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("DOCKER_HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_DOCKER_HOST));
        let api_version = lookup("DOCKER_API_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_API_VERSION));
        let timeout = match lookup("WHALEPRINT_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::validation(
                        format!("expected a positive number of seconds, got '{raw}'"),
                        "WHALEPRINT_TIMEOUT_SECS",
                    )
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let settings = Self {
            base_url: normalize_host(&host)?,
            api_version: api_version.trim_start_matches('v').to_string(),
            timeout: Duration::from_secs(timeout),
        };
        debug!("Using Docker API {} at {}", settings.api_version, settings.base_url);
        Ok(settings)
    }

    /// Overrides the control-plane address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be used.
    pub fn with_docker_host(mut self, host: &str) -> Result<Self> {
        self.base_url = normalize_host(host)?;
        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::from("http://127.0.0.1:2375"),
            api_version: String::from(DEFAULT_API_VERSION),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Turns a `DOCKER_HOST` value into an HTTP base URL.
fn normalize_host(host: &str) -> Result<String> {
    let invalid = |reason: &str| ConfigError::InvalidDockerHost {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let url = match host.split_once("://") {
        Some(("tcp" | "http", rest)) => format!("http://{rest}"),
        Some(("https", rest)) => format!("https://{rest}"),
        Some(("unix" | "npipe", _)) => {
            let message = "socket transports are not supported; expose the daemon over tcp";
            return Err(invalid(message).into());
        }
        Some((scheme, _)) => return Err(invalid(&format!("unknown scheme '{scheme}'")).into()),
        None => format!("http://{host}"),
    };

    let url = url.trim_end_matches('/').to_string();
    if url.ends_with("://") {
        return Err(invalid("missing address").into());
    }
    Ok(url)
}
