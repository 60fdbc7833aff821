use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::{DeserializeOwned, Error as _};
use tracing::debug;
use url::Url;

use crate::api::LockApi;
use crate::error::{ClientError, ClientResult};
use crate::model::{
    AcquireOutcome, AcquireRequest, Lock, LockStatus, LogEntry, RawAcquireResponse,
    ReleaseRequest, RenewReceipt,
};

/// [`LockApi`] over the lock server's JSON/HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpLockApi {
    http: Client,
    base_url: Url,
}

impl HttpLockApi {
    pub fn new(base_url: Url) -> ClientResult<Self> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` applies per request. `None` leaves requests unbounded.
    pub fn with_timeout(base_url: Url, timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn parse(base_url: &str) -> ClientResult<Self> {
        Self::new(Url::parse(base_url)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base url, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let url = self.url(segments)?;
        let res = self.http.get(url).send().await?;
        decode_success(res).await
    }
}

async fn decode_success<T: DeserializeOwned>(res: Response) -> ClientResult<T> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ClientError::UnexpectedStatus { status, body });
    }
    let bytes = res.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl LockApi for HttpLockApi {
    async fn fetch_locks(&self) -> ClientResult<Vec<Lock>> {
        let locks: Vec<Lock> = self.get_json(&["locks"]).await?;
        debug!(count = locks.len(), "fetched lock snapshot");
        Ok(locks)
    }

    async fn fetch_log(&self) -> ClientResult<Vec<LogEntry>> {
        let entries: Vec<LogEntry> = self.get_json(&["log"]).await?;
        debug!(count = entries.len(), "fetched action log");
        Ok(entries)
    }

    async fn status(&self, name: &str) -> ClientResult<LockStatus> {
        self.get_json(&["status", name]).await
    }

    async fn acquire(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<AcquireOutcome> {
        let url = self.url(&["lock", name])?;
        let res = self
            .http
            .post(url)
            .json(&AcquireRequest { owner, ttl })
            .send()
            .await?;
        let raw: RawAcquireResponse = decode_success(res).await?;
        match raw.status.as_str() {
            "locked" => Ok(AcquireOutcome::Locked),
            "conflict" | "already_locked" => {
                let owner = raw.owner.ok_or_else(|| {
                    serde_json::Error::custom("conflict response is missing the holder")
                })?;
                Ok(AcquireOutcome::Conflict {
                    owner,
                    expires_at: raw.expires_at,
                })
            }
            other => Err(serde_json::Error::custom(format!(
                "unknown acquire status `{other}`"
            ))
            .into()),
        }
    }

    async fn renew(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<RenewReceipt> {
        let url = self.url(&["renew", name])?;
        let res = self
            .http
            .post(url)
            .json(&AcquireRequest { owner, ttl })
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ClientError::Renew(res.text().await?));
        }
        // The success body is informational; an empty or foreign shape is still a renewal.
        let bytes = res.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    async fn release(&self, name: &str, owner: &str) -> ClientResult<()> {
        let url = self.url(&["unlock", name])?;
        let res = self
            .http
            .post(url)
            .json(&ReleaseRequest { owner })
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ClientError::Release(res.text().await?));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_encodes_segments() {
        let api = HttpLockApi::parse("http://locks.local:8000").expect("api");
        assert_eq!(
            api.url(&["lock", "db"]).unwrap().as_str(),
            "http://locks.local:8000/lock/db"
        );
        assert_eq!(
            api.url(&["status", "a b/c"]).unwrap().as_str(),
            "http://locks.local:8000/status/a%20b%2Fc"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let api = HttpLockApi::parse("http://gateway.local/locksvc/").expect("api");
        assert_eq!(
            api.url(&["locks"]).unwrap().as_str(),
            "http://gateway.local/locksvc/locks"
        );
    }
}
