use clap::{Parser, Subcommand, ValueEnum};
use lockwatch_core::{DashboardConfig, ReferencePolicy};

#[derive(Parser, Debug)]
#[command(name = "lockwatch")]
#[command(about = "Live dashboard and operator console for the TTL lock service")]
pub struct Cli {
    /// Lock server base URL (overrides LOCKWATCH_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Identity to act as (overrides LOCKWATCH_OWNER)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// How the TTL bar baseline is chosen (overrides LOCKWATCH_REFERENCE_POLICY)
    #[arg(long, global = true, value_enum)]
    pub reference_policy: Option<PolicyArg>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    LastAction,
    SnapshotMax,
}

impl From<PolicyArg> for ReferencePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::LastAction => ReferencePolicy::LastAction,
            PolicyArg::SnapshotMax => ReferencePolicy::SnapshotMax,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the live dashboard (default)
    Watch,
    /// Print the current lock set once
    Locks,
    /// Print the action log once
    Log,
    /// Show whether a lock is held
    Status { name: String },
    /// Acquire a lock
    Lock {
        name: String,
        #[arg(long, default_value_t = 30)]
        ttl: u64,
    },
    /// Extend a lock you hold
    Renew {
        name: String,
        #[arg(long, default_value_t = 30)]
        ttl: u64,
    },
    /// Release a lock you hold
    Unlock { name: String },
}

impl Cli {
    /// Layers flags over the environment-derived config.
    pub fn apply(&self, mut config: DashboardConfig) -> DashboardConfig {
        if let Some(server) = &self.server {
            config.server_url = server.trim().to_string();
        }
        if let Some(owner) = &self.owner {
            config.owner = owner.trim().to_string();
        }
        if let Some(policy) = self.reference_policy {
            config.reference_policy = policy.into();
        }
        config
    }
}
