use async_trait::async_trait;

use crate::error::ClientResult;
use crate::model::{AcquireOutcome, Lock, LockStatus, LogEntry, RenewReceipt};

/// Operations the dashboard consumes from the lock server.
///
/// None of these retry; the polling cadence is the retry mechanism for reads and action
/// failures go straight back to the operator.
#[async_trait]
pub trait LockApi: Send + Sync {
    /// Current full set of locks, in server order.
    async fn fetch_locks(&self) -> ClientResult<Vec<Lock>>;

    /// Action history, in server order. Callers must not re-sort it.
    async fn fetch_log(&self) -> ClientResult<Vec<LogEntry>>;

    async fn status(&self, name: &str) -> ClientResult<LockStatus>;

    async fn acquire(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<AcquireOutcome>;

    async fn renew(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<RenewReceipt>;

    async fn release(&self, name: &str, owner: &str) -> ClientResult<()>;
}
