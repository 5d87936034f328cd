use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the LinkedIn-PDF parsing collaborator.
    pub parse_service_url: String,
    /// Base URL of the resume rendering collaborator.
    pub render_service_url: String,
    /// Deadline for collaborator calls. `None` waits indefinitely.
    pub transfer_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
    /// Idle time after which a session and its profile are discarded.
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            parse_service_url: require_env("PARSE_SERVICE_URL")?,
            render_service_url: require_env("RENDER_SERVICE_URL")?,
            transfer_timeout: optional_env("TRANSFER_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("TRANSFER_TIMEOUT_SECS must be a whole number of seconds")?
                .map(Duration::from_secs),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            session_ttl: Duration::from_secs(
                optional_env("SESSION_TTL_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("SESSION_TTL_SECS must be a whole number of seconds")?
                    .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl Config {
    /// Config pointing both collaborators at `base_url`.
    pub fn for_tests(base_url: &str) -> Self {
        Config {
            parse_service_url: base_url.to_string(),
            render_service_url: base_url.to_string(),
            transfer_timeout: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
