//! Environment-driven client configuration.
//!
//! Every resolver returns the value together with the source that produced
//! it, so callers can log where a setting came from.

use std::time::Duration;

use crate::types::RunRequest;

pub const ENV_BASE_URL: &str = "AGENTDECK_BASE_URL";
pub const ENV_ARCHITECT_MODEL: &str = "AGENTDECK_ARCHITECT_MODEL";
pub const ENV_CODER_MODEL: &str = "AGENTDECK_CODER_MODEL";
pub const ENV_REVIEWER_MODEL: &str = "AGENTDECK_REVIEWER_MODEL";
pub const ENV_STREAM_IDLE_TIMEOUT_SECS: &str = "AGENTDECK_STREAM_IDLE_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

pub const BASE_URL_SOURCE_DEFAULT_LOCAL: &str = "default_local";
pub const TIMEOUT_SOURCE_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBaseUrl {
    pub base_url: String,
    pub source: String,
}

#[must_use]
pub fn resolve_base_url() -> ResolvedBaseUrl {
    if let Some(base_url) = env_non_empty(ENV_BASE_URL) {
        return ResolvedBaseUrl {
            base_url: base_url.trim_end_matches('/').to_string(),
            source: ENV_BASE_URL.to_string(),
        };
    }
    ResolvedBaseUrl {
        base_url: DEFAULT_BASE_URL.to_string(),
        source: BASE_URL_SOURCE_DEFAULT_LOCAL.to_string(),
    }
}

/// Optional per-role model overrides attached to run-start requests. When a
/// role is `None` the backend applies its own default for that role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOverrides {
    pub architect: Option<String>,
    pub coder: Option<String>,
    pub reviewer: Option<String>,
}

impl ModelOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            architect: env_non_empty(ENV_ARCHITECT_MODEL),
            coder: env_non_empty(ENV_CODER_MODEL),
            reviewer: env_non_empty(ENV_REVIEWER_MODEL),
        }
    }

    /// Fills any unset override on the request; explicit request values win.
    #[must_use]
    pub fn apply_to(&self, mut request: RunRequest) -> RunRequest {
        if request.architect_model.is_none() {
            request.architect_model = self.architect.clone();
        }
        if request.coder_model.is_none() {
            request.coder_model = self.coder.clone();
        }
        if request.reviewer_model.is_none() {
            request.reviewer_model = self.reviewer.clone();
        }
        request
    }
}

/// Idle window after which a silent run stream is declared stalled. Invalid
/// or zero values fall back to the default, with the fallback recorded in the
/// returned source.
#[must_use]
pub fn resolve_stream_idle_timeout() -> (Duration, String) {
    if let Some(raw) = env_non_empty(ENV_STREAM_IDLE_TIMEOUT_SECS) {
        if let Ok(secs) = raw.parse::<u64>() {
            if secs > 0 {
                return (
                    Duration::from_secs(secs),
                    ENV_STREAM_IDLE_TIMEOUT_SECS.to_string(),
                );
            }
        }
        return (
            DEFAULT_STREAM_IDLE_TIMEOUT,
            format!("{ENV_STREAM_IDLE_TIMEOUT_SECS}:invalid({raw})->default"),
        );
    }
    (DEFAULT_STREAM_IDLE_TIMEOUT, TIMEOUT_SOURCE_DEFAULT.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
