use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("malformed server payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to renew: {0}")]
    Renew(String),
    #[error("Error releasing lock: {0}")]
    Release(String),
    #[error("{0}")]
    LocalValidation(String),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Network failures and non-success statuses on reads. The next poll is the retry.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::UnexpectedStatus { .. }
        )
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }

    /// Raw text reported by the server for renew/release failures.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Renew(msg) | ClientError::Release(msg) => Some(msg.as_str()),
            ClientError::UnexpectedStatus { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
