use std::time::Duration;

use screenbreak_core::{Config, Request, Response};

use super::popup::render;
use super::{open_headless, print_json, CliResult};

pub fn run(seconds: Option<u64>) -> CliResult {
    let config = Config::load()?;
    let seconds = seconds.unwrap_or(config.breaks.countdown_secs);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(countdown(config, seconds))
}

/// Count down the break, then start it. Interrupting the countdown
/// snoozes instead.
async fn countdown(config: Config, seconds: u64) -> CliResult {
    let mut coordinator = open_headless(&config)?;
    if let Response::Stats(stats) = coordinator.handle(Request::GetStats) {
        eprint!("{}", render(&stats, config.breaks.interval_min));
    }
    eprintln!("Look at something 20 feet away for {seconds} seconds. Ctrl-C to snooze.");

    let request = tokio::select! {
        _ = tick_down(seconds) => Request::StartBreak,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            Request::SnoozeBreak
        }
    };
    tracing::debug!(?request, "countdown finished");

    let response = coordinator.handle(request);
    print_json(&response)?;
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn tick_down(seconds: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;
    for remaining in (1..=seconds).rev() {
        eprint!("\r{remaining:>3}s ");
        ticker.tick().await;
    }
    eprintln!("\r  done.");
}
