use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::model::{Lock, LogEntry};
use crate::permission::can_mutate;
use crate::ttl::{classify, BarColor, ReferencePolicy, UrgencyTier, DEFAULT_REFERENCE_MAX};

/// Inputs every cycle classifies against. Owned by the coordinator and copied into each cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewContext {
    pub identity: String,
    /// Baseline from the most recent successful lock/renew.
    pub reference_max: f64,
    pub policy: ReferencePolicy,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self {
            identity: String::new(),
            reference_max: DEFAULT_REFERENCE_MAX,
            policy: ReferencePolicy::default(),
        }
    }
}

impl ViewContext {
    pub fn new(identity: impl Into<String>, policy: ReferencePolicy) -> Self {
        Self {
            identity: identity.into(),
            policy,
            ..Self::default()
        }
    }

    /// Enriches a raw snapshot. Returns the baseline actually used alongside the rows.
    pub fn reconcile(&self, locks: &[Lock], now_epoch_secs: i64) -> (f64, Vec<ReconciledRow>) {
        let ttls: Vec<i64> = locks
            .iter()
            .map(|lock| lock.effective_ttl(now_epoch_secs))
            .collect();
        let reference = self.policy.reference_for(self.reference_max, &ttls);
        let rows = locks
            .iter()
            .zip(ttls)
            .map(|(lock, ttl_left)| {
                let class = classify(ttl_left as f64, reference);
                ReconciledRow {
                    ttl_left,
                    urgency_tier: class.tier,
                    visual_intensity_pct: class.intensity_pct,
                    bar_color: class.bar_color(),
                    can_mutate: can_mutate(&lock.owner, &self.identity),
                    lock: lock.clone(),
                }
            })
            .collect();
        (reference, rows)
    }
}

/// A lock plus everything derived from it for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRow {
    pub lock: Lock,
    pub ttl_left: i64,
    pub urgency_tier: UrgencyTier,
    pub visual_intensity_pct: f64,
    pub bar_color: BarColor,
    pub can_mutate: bool,
}

/// Render-ready state handed to the [`ViewRenderer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub identity: String,
    pub reference_max: f64,
    pub rows: Vec<ReconciledRow>,
    pub log: Vec<LogEntry>,
    /// Cycle whose lock snapshot produced `rows`; 0 before the first successful fetch.
    pub locks_cycle: u64,
    /// Cycle whose log fetch produced `log`; 0 before the first successful fetch.
    pub log_cycle: u64,
}

impl DashboardView {
    pub fn row(&self, name: &str) -> Option<&ReconciledRow> {
        self.rows.iter().find(|row| row.lock.name == name)
    }

    /// Names of locks the current identity may release.
    pub fn releasable(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|row| row.can_mutate)
            .map(|row| row.lock.name.as_str())
    }
}

/// Draws a reconciled view. Presentation lives entirely outside the core.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &DashboardView);
}

impl<F> ViewRenderer for F
where
    F: Fn(&DashboardView) + Send + Sync,
{
    fn render(&self, view: &DashboardView) {
        (self)(view)
    }
}

pub(crate) fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
