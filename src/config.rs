// src/config.rs
//! Runtime configuration, read from the environment (after `.env`, if any).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_OUTPUT_DIR: &str = "DIGEST_OUTPUT_DIR";
pub const ENV_SOURCE_DELAY_MS: &str = "DIGEST_SOURCE_DELAY_MS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "DIGEST_FETCH_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "DIGEST_USER_AGENT";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

pub const DEFAULT_SOURCE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Directory under which `<date>/` is created.
    pub output_dir: PathBuf,
    pub source_delay: Duration,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub github_token: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            source_delay: Duration::from_millis(DEFAULT_SOURCE_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            github_token: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}")),
        _ => Ok(default),
    }
}

impl DigestConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let timeout_secs = env_u64(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?.max(1);
        Ok(Self {
            output_dir: std::env::var(ENV_OUTPUT_DIR)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            source_delay: Duration::from_millis(env_u64(
                ENV_SOURCE_DELAY_MS,
                DEFAULT_SOURCE_DELAY_MS,
            )?),
            fetch_timeout: Duration::from_secs(timeout_secs),
            user_agent: std::env::var(ENV_USER_AGENT)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            github_token: std::env::var(ENV_GITHUB_TOKEN)
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }
}
