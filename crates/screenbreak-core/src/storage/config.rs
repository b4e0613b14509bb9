//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Break reminder interval, snooze length and break countdown
//! - Break notification window geometry
//! - Dispatcher polling and screen-time tick period
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::host::WindowSpec;

/// Break timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreaksConfig {
    /// Minutes between reminders.
    #[serde(default = "default_interval_min")]
    pub interval_min: u64,
    /// Minutes a snooze postpones the reminder.
    #[serde(default = "default_snooze_min")]
    pub snooze_min: u64,
    /// Seconds the notification counts down once a break starts.
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u64,
}

/// Break notification window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_page")]
    pub page: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_offset")]
    pub left: i32,
    #[serde(default = "default_offset")]
    pub top: i32,
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// How often the daemon looks for due alarms.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Period of the screen-time tick.
    #[serde(default = "default_tick_period_min")]
    pub tick_period_min: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub breaks: BreaksConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// Default functions
fn default_interval_min() -> u64 {
    20
}
fn default_snooze_min() -> u64 {
    5
}
fn default_countdown_secs() -> u64 {
    20
}
fn default_page() -> String {
    "notification.html".into()
}
fn default_width() -> u32 {
    360
}
fn default_height() -> u32 {
    460
}
fn default_offset() -> i32 {
    100
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_tick_period_min() -> u64 {
    1
}

impl Default for BreaksConfig {
    fn default() -> Self {
        Self {
            interval_min: default_interval_min(),
            snooze_min: default_snooze_min(),
            countdown_secs: default_countdown_secs(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            page: default_page(),
            width: default_width(),
            height: default_height(),
            left: default_offset(),
            top: default_offset(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            tick_period_min: default_tick_period_min(),
        }
    }
}

impl NotificationConfig {
    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec {
            page: self.page.clone(),
            width: self.width,
            height: self.height,
            left: self.left,
            top: self.top,
            focused: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Load and validate a config file at an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result does not validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("breaks.interval_min", self.breaks.interval_min),
            ("breaks.snooze_min", self.breaks.snooze_min),
            ("runtime.poll_interval_ms", self.runtime.poll_interval_ms),
            ("runtime.tick_period_min", self.runtime.tick_period_min),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.breaks.interval_min, 20);
        assert_eq!(parsed.notification.width, 360);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[breaks]\nsnooze_min = 10\n").unwrap();
        assert_eq!(parsed.breaks.snooze_min, 10);
        assert_eq!(parsed.breaks.interval_min, 20);
        assert_eq!(parsed.runtime.tick_period_min, 1);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("breaks.interval_min").as_deref(), Some("20"));
        assert_eq!(cfg.get("notification.page").as_deref(), Some("notification.html"));
        assert!(cfg.get("breaks.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("breaks.snooze_min", "7").unwrap();
        assert_eq!(cfg.breaks.snooze_min, 7);
    }

    #[test]
    fn apply_accepts_negative_offsets() {
        let mut cfg = Config::default();
        cfg.apply("notification.left", "-20").unwrap();
        assert_eq!(cfg.notification.left, -20);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.apply("breaks.nonexistent_key", "1");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.apply("breaks.interval_min", "soon");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg.breaks.interval_min, 20);
    }

    #[test]
    fn apply_rejects_zero_interval() {
        let mut cfg = Config::default();
        assert!(cfg.apply("breaks.interval_min", "0").is_err());
        assert_eq!(cfg.breaks.interval_min, 20);
    }

    #[test]
    fn load_rejects_zero_periods() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[runtime]\npoll_interval_ms = 0\n").unwrap();
        let result = Config::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "runtime.poll_interval_ms"
        ));

        std::fs::write(&path, "[runtime]\ntick_period_min = 0\n").unwrap();
        let result = Config::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "runtime.tick_period_min"
        ));
    }

    #[test]
    fn load_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[breaks]\ninterval_min = 25\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.breaks.interval_min, 25);
        assert_eq!(cfg.runtime.poll_interval_ms, 1000);
    }

    #[test]
    fn window_spec_uses_notification_geometry() {
        let spec = Config::default().notification.window_spec();
        assert_eq!((spec.width, spec.height), (360, 460));
        assert_eq!((spec.left, spec.top), (100, 100));
        assert!(spec.focused);
    }
}
