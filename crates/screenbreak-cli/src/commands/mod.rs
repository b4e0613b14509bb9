pub mod actions;
pub mod config;
pub mod countdown;
pub mod daemon;
pub mod popup;
pub mod terminal;

use std::sync::Arc;

use screenbreak_core::{
    BreakCoordinator, BreakSettings, Config, Database, HeadlessWindowHost, HostServices,
    SystemClock, WindowHost,
};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the shared database and build a ready coordinator.
///
/// One-shot commands pass a headless window host; the daemon brings its own.
pub fn open_coordinator(
    config: &Config,
    windows: Arc<dyn WindowHost>,
) -> CliResult<BreakCoordinator> {
    let db = Arc::new(Database::open()?);
    let host = HostServices::sqlite(db, windows, Arc::new(SystemClock));
    let mut coordinator = BreakCoordinator::initialize(host, BreakSettings::from_config(config));
    coordinator.ensure_installed()?;
    Ok(coordinator)
}

pub fn open_headless(config: &Config) -> CliResult<BreakCoordinator> {
    open_coordinator(config, Arc::new(HeadlessWindowHost::new()))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
