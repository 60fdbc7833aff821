use std::sync::Arc;

use anyhow::Result;
use lockwatch_core::actions::{acquire_message, release_message, renew_message};
use lockwatch_core::{DashboardHandle, LockStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::render::{format_timestamp, TerminalRenderer};

pub const MISSING_FIELDS: &str = "Fill in all fields.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Owner(String),
    Lock { name: String, ttl: u64 },
    Renew { name: String, ttl: u64 },
    Unlock { name: String },
    Status { name: String },
    Quit,
}

/// Parses one input line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();
    let command = match verb {
        "owner" | "identity" => ConsoleCommand::Owner(args.join(" ")),
        "lock" | "renew" => {
            let name = args.first().copied().unwrap_or_default();
            let ttl = args
                .get(1)
                .and_then(|raw| raw.parse::<u64>().ok())
                .unwrap_or(0);
            if name.is_empty() || ttl == 0 {
                return Err(MISSING_FIELDS.to_string());
            }
            let name = name.to_string();
            if verb == "lock" {
                ConsoleCommand::Lock { name, ttl }
            } else {
                ConsoleCommand::Renew { name, ttl }
            }
        }
        "unlock" | "status" => {
            let Some(name) = args.first() else {
                return Err(format!("usage: {verb} <name>"));
            };
            let name = name.to_string();
            if verb == "unlock" {
                ConsoleCommand::Unlock { name }
            } else {
                ConsoleCommand::Status { name }
            }
        }
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(command))
}

pub fn describe_status(name: &str, status: &LockStatus) -> String {
    match status {
        LockStatus::Free => format!("'{name}' is free"),
        LockStatus::Locked { owner, expires_at } => format!(
            "'{name}' is held by {owner} until {}",
            format_timestamp(*expires_at)
        ),
    }
}

/// Identity input plus the action buttons, driven from stdin lines.
pub struct Console {
    handle: DashboardHandle,
    renderer: Arc<TerminalRenderer>,
    identity: String,
}

impl Console {
    pub fn new(handle: DashboardHandle, renderer: Arc<TerminalRenderer>, identity: String) -> Self {
        Self {
            handle,
            renderer,
            identity,
        }
    }

    /// Runs until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_command(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(message) => self.renderer.notify(message),
            }
        }
        debug!("console input closed");
        Ok(())
    }

    async fn execute(&mut self, command: ConsoleCommand) {
        let actions = self.handle.actions();
        match command {
            ConsoleCommand::Owner(identity) => {
                self.identity = identity.trim().to_string();
                self.handle.set_identity(&self.identity).await;
            }
            ConsoleCommand::Lock { name, ttl } => {
                if self.identity.is_empty() {
                    self.renderer.notify(MISSING_FIELDS);
                    return;
                }
                let result = actions.acquire(&name, &self.identity, ttl).await;
                self.renderer.notify(acquire_message(&result));
            }
            ConsoleCommand::Renew { name, ttl } => {
                if self.identity.is_empty() {
                    self.renderer.notify(MISSING_FIELDS);
                    return;
                }
                let result = actions.renew(&name, &self.identity, ttl).await;
                self.renderer.notify(renew_message(&result));
            }
            ConsoleCommand::Unlock { name } => {
                let view = self.handle.current();
                let offered = view.releasable().any(|releasable| releasable == name);
                if !self.identity.is_empty() && !offered {
                    self.renderer.notify(format!(
                        "No unlock control for '{name}' as {}",
                        self.identity
                    ));
                    return;
                }
                let result = actions.release(&name, &self.identity).await;
                self.renderer.notify(release_message(&name, &result));
            }
            ConsoleCommand::Status { name } => match actions.status(&name).await {
                Ok(status) => self.renderer.notify(describe_status(&name, &status)),
                Err(err) => self.renderer.notify(err.to_string()),
            },
            ConsoleCommand::Quit => {}
        }
    }
}
