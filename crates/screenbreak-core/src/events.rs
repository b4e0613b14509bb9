use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change of the coordinator produces an Event.
/// Front ends subscribe to them; the daemon prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Default record written and alarms created.
    Installed {
        next_break_at_ms: u64,
        at: DateTime<Utc>,
    },
    /// Reminder fired and the break window was opened.
    ReminderShown {
        break_count: u64,
        /// None when the window host failed to open a window.
        window_id: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Reminder fired while disabled or while a break was already showing.
    ReminderIgnored {
        enabled: bool,
        is_break_active: bool,
        at: DateTime<Utc>,
    },
    /// Break taken; a new interval began.
    BreakStarted {
        break_count: u64,
        next_break_at_ms: u64,
        at: DateTime<Utc>,
    },
    BreakSnoozed {
        next_break_at_ms: u64,
        at: DateTime<Utc>,
    },
    RemindersEnabled {
        next_break_at_ms: u64,
        at: DateTime<Utc>,
    },
    RemindersDisabled {
        at: DateTime<Utc>,
    },
    /// Periodic screen-time tick.
    ScreenTimeTracked {
        total_screen_time: u64,
        color_temp: u32,
        at: DateTime<Utc>,
    },
    /// A missing reminder was re-created on startup.
    ReminderRestored {
        next_break_at_ms: u64,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::RemindersDisabled {
            at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RemindersDisabled");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
