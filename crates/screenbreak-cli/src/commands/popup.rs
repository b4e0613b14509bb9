use std::io::Write;
use std::time::Duration;

use screenbreak_core::{BreakCoordinator, Config, NextBreakIn, Request, Response, StatsResponse};

use super::{open_headless, print_json, CliResult};

/// Clears the terminal and homes the cursor.
const CLEAR: &str = "\x1b[2J\x1b[H";

pub fn run(json: bool, watch: bool) -> CliResult {
    let config = Config::load()?;
    let mut coordinator = open_headless(&config)?;

    if watch {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        return runtime.block_on(watch_stats(&mut coordinator, &config, json));
    }

    let stats = fetch(&mut coordinator)?;
    if json {
        return print_json(&stats);
    }
    print!("{}", render(&stats, config.breaks.interval_min));
    Ok(())
}

fn fetch(coordinator: &mut BreakCoordinator) -> CliResult<StatsResponse> {
    match coordinator.handle(Request::GetStats) {
        Response::Stats(stats) => Ok(stats),
        _ => Err("getStats returned no stats".into()),
    }
}

/// Refresh once a second until Ctrl-C.
async fn watch_stats(
    coordinator: &mut BreakCoordinator,
    config: &Config,
    json: bool,
) -> CliResult {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = ticker.tick() => {
                let stats = fetch(coordinator)?;
                let mut stdout = std::io::stdout().lock();
                if json {
                    writeln!(stdout, "{}", serde_json::to_string(&stats)?)?;
                } else {
                    write!(stdout, "{}", frame(&stats, config.breaks.interval_min))?;
                }
                stdout.flush()?;
            }
        }
    }
}

/// One redraw of the watched popup.
pub fn frame(stats: &StatsResponse, interval_min: u64) -> String {
    format!("{CLEAR}{}", render(stats, interval_min))
}

/// Popup text. A stats answer without a usable countdown shows the full
/// interval.
pub fn render(stats: &StatsResponse, interval_min: u64) -> String {
    let countdown = if stats.is_enabled {
        stats.next_break_in
    } else {
        NextBreakIn::full(interval_min)
    };

    let mut out = String::new();
    out.push_str(&format!(
        "Reminders:    {}\n",
        if stats.is_enabled { "on" } else { "off" }
    ));
    if stats.is_break_active {
        out.push_str("Next break:   now (break in progress)\n");
    } else {
        out.push_str(&format!("Next break:   {}\n", countdown.clock_face()));
    }
    out.push_str(&format!(
        "Screen time:  {}\n",
        format_screen_time(stats.total_screen_time)
    ));
    out.push_str(&format!("Color temp:   {}K\n", stats.color_temp));
    out.push_str(&format!("Breaks taken: {}\n", stats.break_count));
    if let Some(error) = &stats.error {
        out.push_str(&format!("(stats from memory: {error})\n"));
    }
    out
}

/// Minutes as `H:MM`.
pub fn format_screen_time(minutes: u64) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> StatsResponse {
        StatsResponse {
            is_enabled: true,
            break_count: 3,
            total_screen_time: 125,
            last_break_time: 0,
            color_temp: 4000,
            next_break_in: NextBreakIn {
                minutes: 14,
                seconds: 5,
                total_seconds: 845,
            },
            is_break_active: false,
            error: None,
        }
    }

    #[test]
    fn screen_time_is_hours_and_minutes() {
        assert_eq!(format_screen_time(0), "0:00");
        assert_eq!(format_screen_time(59), "0:59");
        assert_eq!(format_screen_time(125), "2:05");
    }

    #[test]
    fn renders_countdown_and_counters() {
        let text = render(&stats(), 20);
        assert!(text.contains("Reminders:    on"));
        assert!(text.contains("Next break:   14:05"));
        assert!(text.contains("Screen time:  2:05"));
        assert!(text.contains("Color temp:   4000K"));
        assert!(text.contains("Breaks taken: 3"));
    }

    #[test]
    fn disabled_shows_full_interval() {
        let mut s = stats();
        s.is_enabled = false;
        assert!(render(&s, 20).contains("Next break:   20:00"));
    }

    #[test]
    fn frame_redraws_from_the_top() {
        let text = frame(&stats(), 20);
        assert!(text.starts_with("\x1b[2J\x1b[H"));
        assert!(text.ends_with("Breaks taken: 3\n"));
    }

    #[test]
    fn notes_degraded_stats() {
        let mut s = stats();
        s.error = Some("Store error: Database is locked".into());
        assert!(render(&s, 20).contains("stats from memory"));
    }
}
