use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named lock as reported by `GET /locks`. The server owns it; the client only renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub name: String,
    pub owner: String,
    /// Absolute epoch seconds at which the lock becomes invalid.
    pub expires_at: i64,
    /// Server-computed remaining seconds. Negative or missing when the lock is about to be pruned.
    #[serde(default)]
    pub ttl_left: Option<i64>,
}

impl Lock {
    /// Remaining seconds, falling back to `expires_at - now` when the server omitted `ttl_left`.
    pub fn effective_ttl(&self, now_epoch_secs: i64) -> i64 {
        self.ttl_left
            .unwrap_or_else(|| self.expires_at.saturating_sub(now_epoch_secs))
    }
}

/// One row of the server's append-only action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub name: String,
    pub owner: String,
    pub action: LogAction,
}

/// Action recorded in the history. Unknown verbs are kept verbatim instead of failing decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogAction {
    Acquire,
    Renew,
    Release,
    Expire,
    Other(String),
}

impl LogAction {
    pub fn as_str(&self) -> &str {
        match self {
            LogAction::Acquire => "acquire",
            LogAction::Renew => "renew",
            LogAction::Release => "release",
            LogAction::Expire => "expire",
            LogAction::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for LogAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "acquire" => LogAction::Acquire,
            "renew" => LogAction::Renew,
            "release" => LogAction::Release,
            "expire" | "expired" => LogAction::Expire,
            _ => LogAction::Other(value),
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(LogAction::from)
    }
}

/// Result of `POST /lock/{name}`. A conflict is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Locked,
    Conflict {
        owner: String,
        expires_at: Option<i64>,
    },
}

impl AcquireOutcome {
    pub fn is_locked(&self) -> bool {
        matches!(self, AcquireOutcome::Locked)
    }

    /// One-shot notification text for the operator.
    pub fn message(&self) -> String {
        match self {
            AcquireOutcome::Locked => "Lock acquired.".to_string(),
            AcquireOutcome::Conflict { owner, .. } => format!("Already locked by {owner}"),
        }
    }
}

/// Wire shape of the acquire response.
#[derive(Debug, Deserialize)]
pub(crate) struct RawAcquireResponse {
    pub status: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Acknowledgement of a successful renew. The server body is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RenewReceipt {
    #[serde(default)]
    pub new_expires_at: Option<i64>,
}

/// Result of `GET /status/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LockStatus {
    Free,
    Locked { owner: String, expires_at: i64 },
}

#[derive(Debug, Serialize)]
pub(crate) struct AcquireRequest<'a> {
    pub owner: &'a str,
    pub ttl: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReleaseRequest<'a> {
    pub owner: &'a str,
}
