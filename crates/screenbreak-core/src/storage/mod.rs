mod config;
pub mod database;

pub use config::{BreaksConfig, Config, NotificationConfig, RuntimeConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the screenbreak data directory.
///
/// `SCREENBREAK_DATA_DIR` wins when set. Otherwise `~/.config/screenbreak/`,
/// or `~/.config/screenbreak-dev/` with `SCREENBREAK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("SCREENBREAK_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("SCREENBREAK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("screenbreak-dev")
            } else {
                base_dir.join("screenbreak")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
