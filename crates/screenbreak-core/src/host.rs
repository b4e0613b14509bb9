//! Host services the coordinator delegates to.
//!
//! The coordinator owns no timers, files or windows. It talks to a key-value
//! store, an alarm facility and a window host through these traits; SQLite
//! backs the first two (`storage::Database`), the window host depends on the
//! front end.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, WindowError};

/// Flat key-value map as written to and read from the store.
pub type StoreValues = Map<String, Value>;

/// Persistent key-value store.
pub trait StateStore: Send + Sync {
    /// Fetch the given keys. Missing keys are simply absent from the map.
    fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError>;

    /// Write every entry of `values`, replacing existing ones.
    fn set(&self, values: StoreValues) -> Result<(), StoreError>;
}

/// How an alarm should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSpec {
    /// Delay before the first firing. Defaults to `period_ms` when absent.
    pub delay_ms: Option<u64>,
    /// Repeat period; one-shot when absent.
    pub period_ms: Option<u64>,
}

impl AlarmSpec {
    pub fn once_in_minutes(minutes: u64) -> Self {
        Self {
            delay_ms: Some(minutes_to_ms(minutes)),
            period_ms: None,
        }
    }

    pub fn once_in_ms(delay_ms: u64) -> Self {
        Self {
            delay_ms: Some(delay_ms),
            period_ms: None,
        }
    }

    pub fn every_minutes(minutes: u64) -> Self {
        Self {
            delay_ms: None,
            period_ms: Some(minutes_to_ms(minutes)),
        }
    }

    /// Absolute time of the first firing when created at `now_ms`.
    pub fn first_fire_at(&self, now_ms: u64) -> u64 {
        let delay = self.delay_ms.or(self.period_ms).unwrap_or(0);
        now_ms.saturating_add(delay)
    }
}

/// A scheduled alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub name: String,
    /// Epoch milliseconds of the next firing.
    pub scheduled_at_ms: u64,
    pub period_ms: Option<u64>,
}

impl Alarm {
    pub fn is_periodic(&self) -> bool {
        self.period_ms.is_some()
    }

    /// Next firing strictly after `now_ms`, skipping missed periods.
    pub fn next_after(&self, now_ms: u64) -> Option<u64> {
        let period = self.period_ms.filter(|p| *p > 0)?;
        if self.scheduled_at_ms > now_ms {
            return Some(self.scheduled_at_ms);
        }
        let missed = (now_ms - self.scheduled_at_ms) / period + 1;
        Some(
            self.scheduled_at_ms
                .saturating_add(missed.saturating_mul(period)),
        )
    }
}

/// Named alarm facility. Creating an alarm under an existing name replaces it.
pub trait AlarmScheduler: Send + Sync {
    fn create(&self, name: &str, spec: AlarmSpec, now_ms: u64) -> Result<Alarm, StoreError>;

    /// Remove an alarm. Returns whether one existed.
    fn clear(&self, name: &str) -> Result<bool, StoreError>;

    fn get(&self, name: &str) -> Result<Option<Alarm>, StoreError>;

    /// Pop every alarm due at `now_ms`. One-shot alarms are removed, periodic
    /// ones move to their next firing. A periodic alarm fires once however
    /// many periods it missed.
    fn take_due(&self, now_ms: u64) -> Result<Vec<Alarm>, StoreError>;
}

/// Identifier handed out by a window host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry and content of the break window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub page: String,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub focused: bool,
}

/// Opens and closes the break UI.
pub trait WindowHost: Send + Sync {
    fn open(&self, spec: &WindowSpec) -> Result<WindowId, WindowError>;

    fn close(&self, id: WindowId) -> Result<(), WindowError>;
}

pub(crate) fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(60).saturating_mul(1000)
}
