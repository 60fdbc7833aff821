use std::time::Duration;

use tracing::warn;

use crate::ttl::ReferencePolicy;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOG_FILTER: &str = "warn,lockwatch=info,lockwatch_core=info";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub server_url: String,
    pub owner: String,
    pub reference_policy: ReferencePolicy,
    pub request_timeout: Option<Duration>,
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            owner: String::new(),
            reference_policy: ReferencePolicy::default(),
            request_timeout: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Reads `LOCKWATCH_*` and `RUST_LOG`, loading a `.env` file first when one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let server_url = lookup("LOCKWATCH_SERVER_URL")
            .and_then(normalize)
            .unwrap_or(defaults.server_url);
        let owner = lookup("LOCKWATCH_OWNER")
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let reference_policy = match lookup("LOCKWATCH_REFERENCE_POLICY").and_then(normalize) {
            Some(raw) => ReferencePolicy::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown LOCKWATCH_REFERENCE_POLICY; using last-action");
                ReferencePolicy::LastAction
            }),
            None => defaults.reference_policy,
        };
        let request_timeout = lookup("LOCKWATCH_REQUEST_TIMEOUT_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        let log_filter = lookup("RUST_LOG")
            .and_then(normalize)
            .unwrap_or(defaults.log_filter);
        Self {
            server_url,
            owner,
            reference_policy,
            request_timeout,
            log_filter,
        }
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
