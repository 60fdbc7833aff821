//! Polling coordinator.
//!
//! One task owns the [`Coordinator`] state: the view context, a monotonic cycle counter, the last
//! applied sequence per section, and one in-flight slot plus one pending flag per trigger class.
//! Fetches run in spawned tasks and report back over a channel; a result is applied only if its
//! sequence is newer than what the view already shows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::actions::LockActionClient;
use crate::api::LockApi;
use crate::error::ClientResult;
use crate::log_throttle::{FetchSource, LogThrottle};
use crate::model::{Lock, LogEntry};
use crate::view::{now_epoch_secs, DashboardView, ViewContext, ViewRenderer};

/// Fixed polling cadence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

const TRIGGER_QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerClass {
    Periodic,
    Forced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Tick,
    IdentityChanged(String),
    /// A lock operation got its response. Carries the new bar baseline on lock/renew success.
    ActionCompleted { reference_max: Option<f64> },
}

impl Trigger {
    pub fn class(&self) -> TriggerClass {
        match self {
            Trigger::Tick => TriggerClass::Periodic,
            Trigger::IdentityChanged(_) | Trigger::ActionCompleted { .. } => TriggerClass::Forced,
        }
    }
}

/// A cycle that has been issued and must be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleTicket {
    pub seq: u64,
    pub class: TriggerClass,
    pub context: ViewContext,
}

#[derive(Debug)]
pub struct CycleResult {
    pub ticket: CycleTicket,
    pub locks: ClientResult<Vec<Lock>>,
    pub log: ClientResult<Vec<LogEntry>>,
    pub now_epoch_secs: i64,
}

impl CycleResult {
    pub async fn fetch(api: &dyn LockApi, ticket: CycleTicket) -> Self {
        let (locks, log) = tokio::join!(api.fetch_locks(), api.fetch_log());
        Self {
            ticket,
            locks,
            log,
            now_epoch_secs: now_epoch_secs(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Completion {
    /// At least one section replaced what the view showed.
    pub applied: bool,
    /// Queued cycle for the same class, now ready to issue.
    pub follow_up: Option<CycleTicket>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ClassSlot {
    in_flight: Option<u64>,
    pending: bool,
}

#[derive(Debug)]
pub struct Coordinator {
    context: ViewContext,
    next_seq: u64,
    locks_applied: u64,
    log_applied: u64,
    periodic: ClassSlot,
    forced: ClassSlot,
    view: DashboardView,
    throttle: LogThrottle,
}

impl Coordinator {
    pub fn new(context: ViewContext) -> Self {
        let view = DashboardView {
            identity: context.identity.clone(),
            reference_max: context.reference_max,
            ..DashboardView::default()
        };
        Self {
            context,
            next_seq: 1,
            locks_applied: 0,
            log_applied: 0,
            periodic: ClassSlot::default(),
            forced: ClassSlot::default(),
            view,
            throttle: LogThrottle::default(),
        }
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    fn slot(&mut self, class: TriggerClass) -> &mut ClassSlot {
        match class {
            TriggerClass::Periodic => &mut self.periodic,
            TriggerClass::Forced => &mut self.forced,
        }
    }

    /// Applies the trigger's state write, then issues a cycle unless its class is busy.
    pub fn on_trigger(&mut self, trigger: Trigger) -> Option<CycleTicket> {
        let class = trigger.class();
        match trigger {
            Trigger::Tick => {}
            Trigger::IdentityChanged(identity) => {
                debug!(identity = %identity, "identity changed");
                self.context.identity = identity;
            }
            Trigger::ActionCompleted { reference_max } => {
                if let Some(reference) = reference_max.filter(|value| *value > 0.0) {
                    self.context.reference_max = reference;
                }
            }
        }

        let slot = self.slot(class);
        if let Some(seq) = slot.in_flight {
            trace!(class = ?class, in_flight = seq, "cycle busy; queueing one more");
            slot.pending = true;
            return None;
        }
        Some(self.issue(class))
    }

    fn issue(&mut self, class: TriggerClass) -> CycleTicket {
        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = self.slot(class);
        slot.in_flight = Some(seq);
        slot.pending = false;
        CycleTicket {
            seq,
            class,
            context: self.context.clone(),
        }
    }

    /// Folds a finished cycle into the view and releases its class slot.
    pub fn complete(&mut self, result: CycleResult) -> Completion {
        let CycleResult {
            ticket,
            locks,
            log,
            now_epoch_secs,
        } = result;
        let seq = ticket.seq;

        let mut applied = false;
        if seq <= self.locks_applied {
            debug!(cycle = seq, applied = self.locks_applied, "discarding stale lock snapshot");
        } else {
            match locks {
                Ok(locks) => {
                    if let Some(streak) = self.throttle.record_success(FetchSource::Locks) {
                        info!(cycle = seq, failures = streak, "lock snapshot fetch recovered");
                    }
                    let (reference, rows) = ticket.context.reconcile(&locks, now_epoch_secs);
                    self.view.identity = ticket.context.identity.clone();
                    self.view.reference_max = reference;
                    self.view.rows = rows;
                    self.view.locks_cycle = seq;
                    self.locks_applied = seq;
                    applied = true;
                }
                Err(err) => {
                    if self.throttle.should_log_failure(FetchSource::Locks) {
                        warn!(cycle = seq, error = %err, "lock snapshot fetch failed; keeping previous view");
                    }
                }
            }
        }

        if seq <= self.log_applied {
            debug!(cycle = seq, applied = self.log_applied, "discarding stale log");
        } else {
            match log {
                Ok(entries) => {
                    if let Some(streak) = self.throttle.record_success(FetchSource::Log) {
                        info!(cycle = seq, failures = streak, "log fetch recovered");
                    }
                    self.view.log = entries;
                    self.view.log_cycle = seq;
                    self.log_applied = seq;
                    applied = true;
                }
                Err(err) => {
                    if self.throttle.should_log_failure(FetchSource::Log) {
                        warn!(cycle = seq, error = %err, "log fetch failed; keeping previous view");
                    }
                }
            }
        }

        let class = ticket.class;
        let slot = self.slot(class);
        if slot.in_flight == Some(seq) {
            slot.in_flight = None;
        }
        let follow_up = if slot.pending && slot.in_flight.is_none() {
            Some(self.issue(class))
        } else {
            None
        };

        Completion { applied, follow_up }
    }
}

/// Front door to a running dashboard.
#[derive(Clone)]
pub struct DashboardHandle {
    triggers: mpsc::Sender<Trigger>,
    view: watch::Receiver<Arc<DashboardView>>,
    actions: LockActionClient,
}

impl DashboardHandle {
    /// Switches the local identity and forces a cycle. Surrounding whitespace is dropped.
    pub async fn set_identity(&self, identity: &str) {
        let identity = identity.trim().to_string();
        if self
            .triggers
            .send(Trigger::IdentityChanged(identity))
            .await
            .is_err()
        {
            debug!("dashboard stopped; identity change dropped");
        }
    }

    pub fn actions(&self) -> &LockActionClient {
        &self.actions
    }

    pub fn current(&self) -> Arc<DashboardView> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view.clone()
    }
}

/// Starts the coordinator task. It stops once every handle and action client is dropped.
pub fn spawn_dashboard(
    api: Arc<dyn LockApi>,
    renderer: Arc<dyn ViewRenderer>,
    context: ViewContext,
) -> (DashboardHandle, JoinHandle<()>) {
    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_DEPTH);
    let coordinator = Coordinator::new(context);
    let (view_tx, view_rx) = watch::channel(Arc::new(coordinator.view().clone()));
    let handle = DashboardHandle {
        triggers: trigger_tx.clone(),
        view: view_rx,
        actions: LockActionClient::attached(api.clone(), trigger_tx),
    };
    let task = tokio::spawn(run(coordinator, api, renderer, trigger_rx, view_tx));
    (handle, task)
}

async fn run(
    mut coordinator: Coordinator,
    api: Arc<dyn LockApi>,
    renderer: Arc<dyn ViewRenderer>,
    mut triggers: mpsc::Receiver<Trigger>,
    view_tx: watch::Sender<Arc<DashboardView>>,
) {
    let (result_tx, mut results) = mpsc::unbounded_channel::<CycleResult>();
    let launch = |ticket: CycleTicket| {
        trace!(cycle = ticket.seq, class = ?ticket.class, "issuing cycle");
        let api = api.clone();
        let result_tx = result_tx.clone();
        tokio::spawn(async move {
            let result = CycleResult::fetch(api.as_ref(), ticket).await;
            let _ = result_tx.send(result);
        });
    };

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        identity = %coordinator.context().identity,
        reference_max = coordinator.context().reference_max,
        "dashboard started"
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(ticket) = coordinator.on_trigger(Trigger::Tick) {
                    launch(ticket);
                }
            }
            trigger = triggers.recv() => {
                let Some(trigger) = trigger else { break };
                if let Some(ticket) = coordinator.on_trigger(trigger) {
                    launch(ticket);
                }
            }
            Some(result) = results.recv() => {
                let completion = coordinator.complete(result);
                if completion.applied {
                    renderer.render(coordinator.view());
                    view_tx.send_replace(Arc::new(coordinator.view().clone()));
                }
                if let Some(ticket) = completion.follow_up {
                    launch(ticket);
                }
            }
        }
    }
    info!("dashboard stopped");
}
