use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Mutex;

use chrono::{Local, TimeZone};
use crossterm::cursor::MoveTo;
use crossterm::style::{style, Stylize};
use crossterm::terminal::{Clear, ClearType};
use lockwatch_core::view::ReconciledRow;
use lockwatch_core::{BarColor, DashboardView, LogEntry, UrgencyTier, ViewRenderer};
use tracing::warn;

const BAR_CELLS: usize = 20;

/// Full-screen text renderer. Repaints on every reconciled view.
pub struct TerminalRenderer {
    color: bool,
    notice: Mutex<Option<String>>,
}

impl TerminalRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            notice: Mutex::new(None),
        }
    }

    /// Shows `message` under the tables until the next notification replaces it.
    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        println!("{message}");
        if let Ok(mut notice) = self.notice.lock() {
            *notice = Some(message);
        }
    }
}

impl ViewRenderer for TerminalRenderer {
    fn render(&self, view: &DashboardView) {
        let notice = self.notice.lock().ok().and_then(|notice| notice.clone());
        let frame = format_dashboard(view, notice.as_deref(), self.color);
        let mut stdout = std::io::stdout().lock();
        if self.color {
            if let Err(err) = crossterm::queue!(stdout, MoveTo(0, 0), Clear(ClearType::All)) {
                warn!(error = %err, "failed to clear terminal");
            }
        }
        if let Err(err) = stdout
            .write_all(frame.as_bytes())
            .and_then(|_| stdout.flush())
        {
            warn!(error = %err, "failed to draw dashboard");
        }
    }
}

pub fn format_dashboard(view: &DashboardView, notice: Option<&str>, color: bool) -> String {
    let mut out = String::new();
    let identity = if view.identity.is_empty() {
        "(none)"
    } else {
        view.identity.as_str()
    };
    let _ = writeln!(
        out,
        "lockwatch  identity: {identity}  scale: {}s",
        view.reference_max
    );
    let _ = writeln!(out);
    out.push_str(&format_locks(&view.rows, color));
    let _ = writeln!(out);
    out.push_str(&format_log(&view.log));
    if let Some(notice) = notice {
        let _ = writeln!(out);
        let _ = writeln!(out, "> {notice}");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "commands: owner <name> | lock <name> <ttl> | renew <name> <ttl> | unlock <name> | status <name> | quit"
    );
    out
}

pub fn format_locks(rows: &[ReconciledRow], color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<16} {:<19} {:>6}  {:<width$}  {}",
        "LOCK",
        "OWNER",
        "EXPIRES",
        "TTL",
        "REMAINING",
        "",
        width = BAR_CELLS + 2
    );
    if rows.is_empty() {
        let _ = writeln!(out, "(no locks held)");
    }
    for row in rows {
        let line = format!(
            "{:<20} {:<16} {:<19} {:>5}s",
            row.lock.name,
            row.lock.owner,
            format_timestamp(row.lock.expires_at),
            row.ttl_left
        );
        let bar = bar(row.visual_intensity_pct);
        let unlock = if row.can_mutate { "[unlock]" } else { "" };
        if color {
            let _ = writeln!(
                out,
                "{}  {}  {unlock}",
                paint_tier(&line, row.urgency_tier),
                paint_bar(&bar, row.bar_color)
            );
        } else {
            let _ = writeln!(
                out,
                "{line}  {bar}  {:<8} {unlock}",
                row.urgency_tier.as_str()
            );
        }
    }
    out
}

pub fn format_log(entries: &[LogEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<19}  {:<20} {:<16} {}", "TIME", "LOCK", "OWNER", "ACTION");
    if entries.is_empty() {
        let _ = writeln!(out, "(no history)");
    }
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<19}  {:<20} {:<16} {}",
            format_timestamp(entry.timestamp),
            entry.name,
            entry.owner,
            entry.action
        );
    }
    out
}

pub fn format_timestamp(epoch_secs: i64) -> String {
    Local
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

fn bar(intensity_pct: f64) -> String {
    let filled = ((intensity_pct / 100.0) * BAR_CELLS as f64).round() as usize;
    let filled = filled.min(BAR_CELLS);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(BAR_CELLS - filled))
}

fn paint_tier(text: &str, tier: UrgencyTier) -> String {
    match tier {
        UrgencyTier::Ok => style(text).green().to_string(),
        UrgencyTier::Warning => style(text).yellow().to_string(),
        UrgencyTier::Critical => style(text).red().to_string(),
    }
}

fn paint_bar(text: &str, color: BarColor) -> String {
    match color {
        BarColor::Healthy => style(text).green().to_string(),
        BarColor::Caution => style(text).yellow().to_string(),
        BarColor::Danger => style(text).red().to_string(),
    }
}
