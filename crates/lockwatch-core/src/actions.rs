use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::LockApi;
use crate::error::{ClientError, ClientResult};
use crate::model::{AcquireOutcome, LockStatus, RenewReceipt};
use crate::reconcile::Trigger;

pub const MISSING_OWNER_MESSAGE: &str = "Please enter your name before unlocking.";

/// Issues lock/renew/unlock and tells the dashboard to refresh once each response is in.
///
/// Only `release` validates locally (non-empty owner). `acquire` and `renew` forward whatever
/// they are given and let the server decide; field checks belong to the input surface.
#[derive(Clone)]
pub struct LockActionClient {
    api: Arc<dyn LockApi>,
    triggers: Option<mpsc::Sender<Trigger>>,
}

impl LockActionClient {
    /// A client with no dashboard to refresh, for one-shot use.
    pub fn detached(api: Arc<dyn LockApi>) -> Self {
        Self {
            api,
            triggers: None,
        }
    }

    pub(crate) fn attached(api: Arc<dyn LockApi>, triggers: mpsc::Sender<Trigger>) -> Self {
        Self {
            api,
            triggers: Some(triggers),
        }
    }

    pub async fn acquire(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<AcquireOutcome> {
        let result = self.api.acquire(name, owner, ttl).await;
        match &result {
            Ok(AcquireOutcome::Locked) => info!(lock = name, owner, ttl, "lock acquired"),
            Ok(AcquireOutcome::Conflict { owner: holder, .. }) => {
                info!(lock = name, owner, holder = %holder, "lock already held")
            }
            Err(err) => warn!(lock = name, owner, error = %err, "acquire failed"),
        }
        let reference = match &result {
            Ok(AcquireOutcome::Locked) => Some(ttl as f64),
            _ => None,
        };
        self.completed(reference).await;
        result
    }

    pub async fn renew(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<RenewReceipt> {
        let result = self.api.renew(name, owner, ttl).await;
        match &result {
            Ok(receipt) => info!(
                lock = name,
                owner,
                ttl,
                new_expires_at = ?receipt.new_expires_at,
                "lock renewed"
            ),
            Err(err) => warn!(lock = name, owner, error = %err, "renew failed"),
        }
        let reference = result.as_ref().ok().map(|_| ttl as f64);
        self.completed(reference).await;
        result
    }

    pub async fn release(&self, name: &str, owner: &str) -> ClientResult<()> {
        if owner.trim().is_empty() {
            return Err(ClientError::LocalValidation(MISSING_OWNER_MESSAGE.into()));
        }
        let result = self.api.release(name, owner).await;
        match &result {
            Ok(()) => info!(lock = name, owner, "lock released"),
            Err(err) => warn!(lock = name, owner, error = %err, "release failed"),
        }
        self.completed(None).await;
        result
    }

    /// Read-only; does not trigger a refresh.
    pub async fn status(&self, name: &str) -> ClientResult<LockStatus> {
        self.api.status(name).await
    }

    async fn completed(&self, reference_max: Option<f64>) {
        let Some(triggers) = &self.triggers else {
            return;
        };
        if triggers
            .send(Trigger::ActionCompleted { reference_max })
            .await
            .is_err()
        {
            debug!("dashboard stopped; skipping post-action refresh");
        }
    }
}

/// Operator-facing notification for a renew attempt.
pub fn renew_message(result: &ClientResult<RenewReceipt>) -> String {
    match result {
        Ok(_) => "Lock renewed.".to_string(),
        Err(err) => err.to_string(),
    }
}

/// Operator-facing notification for a release attempt.
pub fn release_message(name: &str, result: &ClientResult<()>) -> String {
    match result {
        Ok(()) => format!("Lock '{name}' released."),
        Err(err) => err.to_string(),
    }
}

/// Operator-facing notification for an acquire attempt.
pub fn acquire_message(result: &ClientResult<AcquireOutcome>) -> String {
    match result {
        Ok(outcome) => outcome.message(),
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lock, LogEntry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LockApi for CountingApi {
        async fn fetch_locks(&self) -> ClientResult<Vec<Lock>> {
            Ok(Vec::new())
        }
        async fn fetch_log(&self) -> ClientResult<Vec<LogEntry>> {
            Ok(Vec::new())
        }
        async fn status(&self, _name: &str) -> ClientResult<LockStatus> {
            Ok(LockStatus::Free)
        }
        async fn acquire(&self, _: &str, _: &str, _: u64) -> ClientResult<AcquireOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AcquireOutcome::Conflict {
                owner: "bob".into(),
                expires_at: None,
            })
        }
        async fn renew(&self, _: &str, _: &str, _: u64) -> ClientResult<RenewReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Renew("You don't own the lock".into()))
        }
        async fn release(&self, _: &str, _: &str) -> ClientResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Release("Lock not found".into()))
        }
    }

    #[tokio::test]
    async fn release_without_owner_skips_network() {
        let api = Arc::new(CountingApi::default());
        let (tx, mut rx) = mpsc::channel(4);
        let client = LockActionClient::attached(api.clone(), tx);

        let err = client.release("db", "  ").await.unwrap_err();
        assert!(matches!(err, ClientError::LocalValidation(_)));
        assert_eq!(err.to_string(), MISSING_OWNER_MESSAGE);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn renew_without_owner_still_reaches_server() {
        let api = Arc::new(CountingApi::default());
        let client = LockActionClient::detached(api.clone());

        let result = client.renew("db", "", 30).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            renew_message(&result),
            "Failed to renew: You don't own the lock"
        );
    }

    #[tokio::test]
    async fn conflict_does_not_move_reference() {
        let api = Arc::new(CountingApi::default());
        let (tx, mut rx) = mpsc::channel(4);
        let client = LockActionClient::attached(api, tx);

        let result = client.acquire("db", "alice", 30).await;
        assert_eq!(acquire_message(&result), "Already locked by bob");
        assert_eq!(
            rx.recv().await,
            Some(Trigger::ActionCompleted {
                reference_max: None
            })
        );
    }

    #[tokio::test]
    async fn repeated_release_reports_same_error_class() {
        let api = Arc::new(CountingApi::default());
        let client = LockActionClient::detached(api);
        for _ in 0..2 {
            let result = client.release("db", "alice").await;
            assert!(matches!(result, Err(ClientError::Release(_))));
            assert_eq!(
                release_message("db", &result),
                "Error releasing lock: Lock not found"
            );
        }
    }
}
