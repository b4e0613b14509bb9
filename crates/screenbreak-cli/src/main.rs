use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "screenbreak", version, about = "Screenbreak eye-break reminder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show status, countdown and screen time
    Popup {
        /// Print the raw stats instead
        #[arg(long)]
        json: bool,
        /// Refresh every second until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Print current stats as JSON
    Stats,
    /// Take a break now and restart the interval
    StartBreak,
    /// Postpone the next reminder
    Snooze,
    /// Turn reminders on
    Enable,
    /// Turn reminders off
    Disable,
    /// Run the break countdown, then start the break
    Countdown {
        /// Length of the countdown in seconds (default from config)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Fire any alarms that are due and exit
    Poll,
    /// Run the coordinator in the foreground (JSON lines on stdin/stdout)
    Daemon,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("SCREENBREAK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Commands::Daemon => "info",
        _ => "warn",
    });

    let result = match cli.command {
        Commands::Popup { json, watch } => commands::popup::run(json, watch),
        Commands::Stats => commands::actions::stats(),
        Commands::StartBreak => commands::actions::start_break(),
        Commands::Snooze => commands::actions::snooze(),
        Commands::Enable => commands::actions::toggle(true),
        Commands::Disable => commands::actions::toggle(false),
        Commands::Countdown { seconds } => commands::countdown::run(seconds),
        Commands::Poll => commands::actions::poll(),
        Commands::Daemon => commands::daemon::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
