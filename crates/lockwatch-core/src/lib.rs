//! lockwatch core: the client-side reconciliation engine behind the lock dashboard.
//!
//! Responsibilities:
//! - polling the lock server for the lock set and the action log
//! - deriving TTL urgency and ownership permissions for every row
//! - issuing lock/renew/unlock and refreshing right after each response
//! - keeping the rendered view monotonic when fetches race or fail

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod log_throttle;
pub mod model;
pub mod permission;
pub mod reconcile;
pub mod ttl;
pub mod view;

pub use actions::LockActionClient;
pub use api::LockApi;
pub use config::DashboardConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpLockApi;
pub use model::{AcquireOutcome, Lock, LockStatus, LogAction, LogEntry, RenewReceipt};
pub use reconcile::{spawn_dashboard, DashboardHandle, POLL_INTERVAL};
pub use ttl::{classify, BarColor, ReferencePolicy, UrgencyTier, DEFAULT_REFERENCE_MAX};
pub use view::{DashboardView, ReconciledRow, ViewContext, ViewRenderer};
