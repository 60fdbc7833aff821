#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use lockwatch_core::model::{AcquireOutcome, Lock, LockStatus, LogAction, LogEntry, RenewReceipt};
use lockwatch_core::{ClientError, ClientResult, DashboardView, LockApi};
use tokio::sync::{watch, Notify};

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[derive(Default)]
struct FakeState {
    locks: BTreeMap<String, (String, i64)>,
    log: Vec<LogEntry>,
}

/// In-process lock server used to drive the dashboard without HTTP.
#[derive(Default)]
pub struct FakeLockApi {
    state: Mutex<FakeState>,
    failing: AtomicBool,
    lock_fetches: AtomicUsize,
    hold_next: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeLockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, name: &str, owner: &str, ttl: i64) {
        let mut state = self.state.lock().unwrap();
        state
            .locks
            .insert(name.to_string(), (owner.to_string(), now() + ttl));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lock_fetches(&self) -> usize {
        self.lock_fetches.load(Ordering::SeqCst)
    }

    /// The next `fetch_locks` snapshots state immediately but only returns once `release` fires.
    /// `entered` fires as soon as that call has taken its snapshot.
    pub fn hold_next_lock_fetch(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold_next.lock().unwrap() = Some((entered.clone(), release.clone()));
        (entered, release)
    }

    fn record(state: &mut FakeState, name: &str, owner: &str, action: LogAction) {
        state.log.insert(
            0,
            LogEntry {
                timestamp: now(),
                name: name.to_string(),
                owner: owner.to_string(),
                action,
            },
        );
    }
}

#[async_trait]
impl LockApi for FakeLockApi {
    async fn fetch_locks(&self) -> ClientResult<Vec<Lock>> {
        self.lock_fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::LocalValidation("server unreachable".into()));
        }
        let snapshot: Vec<Lock> = {
            let state = self.state.lock().unwrap();
            let now = now();
            state
                .locks
                .iter()
                .map(|(name, (owner, expires_at))| Lock {
                    name: name.clone(),
                    owner: owner.clone(),
                    expires_at: *expires_at,
                    ttl_left: Some(expires_at - now),
                })
                .collect()
        };
        let held = self.hold_next.lock().unwrap().take();
        if let Some((entered, release)) = held {
            entered.notify_one();
            release.notified().await;
        }
        Ok(snapshot)
    }

    async fn fetch_log(&self) -> ClientResult<Vec<LogEntry>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::LocalValidation("server unreachable".into()));
        }
        Ok(self.state.lock().unwrap().log.clone())
    }

    async fn status(&self, name: &str) -> ClientResult<LockStatus> {
        let state = self.state.lock().unwrap();
        Ok(match state.locks.get(name) {
            Some((owner, expires_at)) => LockStatus::Locked {
                owner: owner.clone(),
                expires_at: *expires_at,
            },
            None => LockStatus::Free,
        })
    }

    async fn acquire(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<AcquireOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some((holder, expires_at)) = state.locks.get(name).cloned() {
            return Ok(AcquireOutcome::Conflict {
                owner: holder,
                expires_at: Some(expires_at),
            });
        }
        state
            .locks
            .insert(name.to_string(), (owner.to_string(), now() + ttl as i64));
        Self::record(&mut state, name, owner, LogAction::Acquire);
        Ok(AcquireOutcome::Locked)
    }

    async fn renew(&self, name: &str, owner: &str, ttl: u64) -> ClientResult<RenewReceipt> {
        let mut state = self.state.lock().unwrap();
        let new_expires_at = now() + ttl as i64;
        match state.locks.get_mut(name) {
            None => return Err(ClientError::Renew("Lock not found".into())),
            Some((holder, _)) if holder.as_str() != owner => {
                return Err(ClientError::Renew("You don't own the lock".into()))
            }
            Some((_, expires_at)) => *expires_at = new_expires_at,
        }
        Self::record(&mut state, name, owner, LogAction::Renew);
        Ok(RenewReceipt {
            new_expires_at: Some(new_expires_at),
        })
    }

    async fn release(&self, name: &str, owner: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        match state.locks.get(name) {
            None => return Err(ClientError::Release("Lock not found".into())),
            Some((holder, _)) if holder.as_str() != owner => {
                return Err(ClientError::Release("You don't own the lock".into()))
            }
            Some(_) => {}
        }
        state.locks.remove(name);
        Self::record(&mut state, name, owner, LogAction::Release);
        Ok(())
    }
}

/// Waits until the published view satisfies `predicate`, panicking after `limit`.
pub async fn wait_for_view<F>(
    rx: &mut watch::Receiver<Arc<DashboardView>>,
    limit: Duration,
    predicate: F,
) -> Arc<DashboardView>
where
    F: Fn(&DashboardView) -> bool,
{
    tokio::time::timeout(limit, async {
        loop {
            {
                let view = rx.borrow_and_update().clone();
                if predicate(&view) {
                    return view;
                }
            }
            rx.changed().await.expect("dashboard stopped");
        }
    })
    .await
    .expect("view never reached expected state")
}
