mod cli;
mod console;
mod render;
mod telemetry;

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lockwatch_core::actions::{acquire_message, release_message, renew_message};
use lockwatch_core::{
    spawn_dashboard, DashboardConfig, HttpLockApi, LockActionClient, LockApi, ViewContext,
};
use tracing::{info, warn};
use url::Url;

use crate::cli::{Cli, Command};
use crate::console::{describe_status, Console};
use crate::render::{format_locks, format_log, TerminalRenderer};

/// Grace period for blocking stdin reads when the runtime shuts down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.apply(DashboardConfig::from_env());
    telemetry::init_tracing(&config.log_filter);

    let base_url = Url::parse(&config.server_url)
        .with_context(|| format!("invalid server url `{}`", config.server_url))?;
    let api: Arc<dyn LockApi> =
        Arc::new(HttpLockApi::with_timeout(base_url, config.request_timeout)?);

    dispatch(api, &config, cli.command.clone().unwrap_or(Command::Watch)).await
}

async fn dispatch(api: Arc<dyn LockApi>, config: &DashboardConfig, command: Command) -> Result<()> {
    let actions = LockActionClient::detached(api.clone());
    let context = ViewContext::new(config.owner.clone(), config.reference_policy);
    let now = chrono::Utc::now().timestamp();
    match command {
        Command::Watch => return watch(api, config).await,
        Command::Locks => {
            let locks = api.fetch_locks().await?;
            let (_, rows) = context.reconcile(&locks, now);
            print!("{}", format_locks(&rows, false));
        }
        Command::Log => {
            let log = api.fetch_log().await?;
            print!("{}", format_log(&log));
        }
        Command::Status { name } => {
            let status = actions.status(&name).await?;
            println!("{}", describe_status(&name, &status));
        }
        Command::Lock { name, ttl } => {
            let result = actions.acquire(&name, &config.owner, ttl).await;
            println!("{}", acquire_message(&result));
            result?;
        }
        Command::Renew { name, ttl } => {
            let result = actions.renew(&name, &config.owner, ttl).await;
            println!("{}", renew_message(&result));
            result?;
        }
        Command::Unlock { name } => {
            let result = actions.release(&name, &config.owner).await;
            println!("{}", release_message(&name, &result));
            result?;
        }
    }
    Ok(())
}

async fn watch(api: Arc<dyn LockApi>, config: &DashboardConfig) -> Result<()> {
    let renderer = Arc::new(TerminalRenderer::new(std::io::stdout().is_terminal()));
    let context = ViewContext::new(config.owner.clone(), config.reference_policy);
    let (handle, task) = spawn_dashboard(api, renderer.clone(), context);
    info!(server = %config.server_url, "watching lock server");

    let console = Console::new(handle, renderer, config.owner.clone());
    tokio::select! {
        result = console.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for ctrl-c");
            }
        }
    }

    // Dropping the console released the last handle, so the loop winds down.
    if let Err(err) = task.await {
        warn!(error = %err, "dashboard task ended abnormally");
    }
    Ok(())
}
