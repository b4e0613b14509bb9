//! One request per invocation, answered as JSON on stdout.

use std::sync::Arc;

use screenbreak_core::{Config, Request, Response};

use super::terminal::TerminalWindowHost;
use super::{open_coordinator, open_headless, print_json, CliResult};

fn send(request: Request) -> CliResult<Response> {
    let config = Config::load()?;
    let mut coordinator = open_headless(&config)?;
    Ok(coordinator.handle(request))
}

/// Print the response; a protocol failure still prints, then exits non-zero.
fn answer(request: Request) -> CliResult {
    let response = send(request)?;
    print_json(&response)?;
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

pub fn stats() -> CliResult {
    answer(Request::GetStats)
}

pub fn start_break() -> CliResult {
    answer(Request::StartBreak)
}

pub fn snooze() -> CliResult {
    answer(Request::SnoozeBreak)
}

pub fn toggle(is_enabled: bool) -> CliResult {
    answer(Request::ToggleEnabled { is_enabled })
}

/// Fire due alarms once. A reminder that comes due shows the terminal banner
/// and the events it caused are reported next to the count.
pub fn poll() -> CliResult {
    let config = Config::load()?;
    let mut coordinator = open_coordinator(&config, Arc::new(TerminalWindowHost::default()))?;
    let mut events = coordinator.subscribe();
    coordinator.reconcile_alarms()?;
    let fired = coordinator.fire_due_alarms()?;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    print_json(&serde_json::json!({
        "fired": fired,
        "isBreakActive": coordinator.session().is_break_active,
        "events": seen,
    }))
}
