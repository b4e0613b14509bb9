//! The break session record.
//!
//! One process-wide record holds every counter and flag. It lives in memory
//! inside the coordinator and is written through to the store on every
//! mutation. When both copies are available the stored one wins
//! ([`BreakSession::merge_stored`]); missing or mistyped stored keys fall back
//! to the in-memory value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::StoreValues;

/// Keys of the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    IsEnabled,
    BreakInterval,
    BreakCount,
    TotalScreenTime,
    LastBreakTime,
    ColorTemp,
    IsBreakActive,
}

impl SessionKey {
    pub const ALL: [SessionKey; 7] = [
        SessionKey::IsEnabled,
        SessionKey::BreakInterval,
        SessionKey::BreakCount,
        SessionKey::TotalScreenTime,
        SessionKey::LastBreakTime,
        SessionKey::ColorTemp,
        SessionKey::IsBreakActive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKey::IsEnabled => "isEnabled",
            SessionKey::BreakInterval => "breakInterval",
            SessionKey::BreakCount => "breakCount",
            SessionKey::TotalScreenTime => "totalScreenTime",
            SessionKey::LastBreakTime => "lastBreakTime",
            SessionKey::ColorTemp => "colorTemp",
            SessionKey::IsBreakActive => "isBreakActive",
        }
    }

    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakSession {
    #[serde(rename = "isEnabled")]
    pub enabled: bool,
    /// Minutes between reminders.
    #[serde(rename = "breakInterval")]
    pub break_interval_min: u64,
    pub break_count: u64,
    /// Minutes.
    pub total_screen_time: u64,
    /// Epoch milliseconds at which the current interval began.
    pub last_break_time: u64,
    /// Kelvin.
    pub color_temp: u32,
    pub is_break_active: bool,
}

impl BreakSession {
    /// The record a fresh installation starts with.
    pub fn install_defaults(break_interval_min: u64, now_ms: u64, color_temp: u32) -> Self {
        Self {
            enabled: true,
            break_interval_min,
            break_count: 0,
            total_screen_time: 0,
            last_break_time: now_ms,
            color_temp,
            is_break_active: false,
        }
    }

    fn value_of(&self, key: SessionKey) -> Value {
        match key {
            SessionKey::IsEnabled => Value::from(self.enabled),
            SessionKey::BreakInterval => Value::from(self.break_interval_min),
            SessionKey::BreakCount => Value::from(self.break_count),
            SessionKey::TotalScreenTime => Value::from(self.total_screen_time),
            SessionKey::LastBreakTime => Value::from(self.last_break_time),
            SessionKey::ColorTemp => Value::from(self.color_temp),
            SessionKey::IsBreakActive => Value::from(self.is_break_active),
        }
    }

    /// The subset of the record named by `keys`, ready for the store.
    pub fn to_store_values(&self, keys: &[SessionKey]) -> StoreValues {
        keys.iter()
            .map(|key| (key.as_str().to_string(), self.value_of(*key)))
            .collect()
    }

    /// Overlay stored values on this record. Stored values win; absent or
    /// mistyped keys keep the current value. A stored color temperature of
    /// zero counts as absent.
    pub fn merge_stored(&self, stored: &StoreValues) -> Self {
        let mut merged = self.clone();
        if let Some(v) = field(stored, SessionKey::IsEnabled) {
            merged.enabled = v;
        }
        if let Some(v) = field(stored, SessionKey::BreakInterval) {
            merged.break_interval_min = v;
        }
        if let Some(v) = field(stored, SessionKey::BreakCount) {
            merged.break_count = v;
        }
        if let Some(v) = field(stored, SessionKey::TotalScreenTime) {
            merged.total_screen_time = v;
        }
        if let Some(v) = field(stored, SessionKey::LastBreakTime) {
            merged.last_break_time = v;
        }
        if let Some(v) = stored_color_temp(stored) {
            merged.color_temp = v;
        }
        if let Some(v) = field(stored, SessionKey::IsBreakActive) {
            merged.is_break_active = v;
        }
        merged
    }
}

/// Whether the store holds a record at all.
pub fn has_record(stored: &StoreValues) -> bool {
    stored.contains_key(SessionKey::IsEnabled.as_str())
}

/// The stored color temperature, if one is present and non-zero.
pub fn stored_color_temp(stored: &StoreValues) -> Option<u32> {
    field::<u32>(stored, SessionKey::ColorTemp).filter(|v| *v != 0)
}

fn field<T: DeserializeOwned>(stored: &StoreValues, key: SessionKey) -> Option<T> {
    let value = stored.get(key.as_str())?;
    if value.is_null() {
        return None;
    }
    match T::deserialize(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "ignoring mistyped stored value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory() -> BreakSession {
        BreakSession {
            enabled: true,
            break_interval_min: 20,
            break_count: 4,
            total_screen_time: 90,
            last_break_time: 1_000,
            color_temp: 5000,
            is_break_active: false,
        }
    }

    #[test]
    fn stored_values_win() {
        let mut stored = StoreValues::new();
        stored.insert("isEnabled".into(), json!(false));
        stored.insert("breakCount".into(), json!(9));
        let merged = memory().merge_stored(&stored);
        assert!(!merged.enabled);
        assert_eq!(merged.break_count, 9);
        assert_eq!(merged.total_screen_time, 90);
    }

    #[test]
    fn mistyped_and_null_values_fall_back_to_memory() {
        let mut stored = StoreValues::new();
        stored.insert("breakCount".into(), json!("lots"));
        stored.insert("isBreakActive".into(), Value::Null);
        stored.insert("colorTemp".into(), json!(0));
        let merged = memory().merge_stored(&stored);
        assert_eq!(merged, memory());
    }

    #[test]
    fn store_values_use_persisted_key_names() {
        let values = memory().to_store_values(&SessionKey::ALL);
        assert_eq!(values.len(), 7);
        assert_eq!(values.get("isEnabled"), Some(&json!(true)));
        assert_eq!(values.get("breakInterval"), Some(&json!(20)));
        assert_eq!(values.get("lastBreakTime"), Some(&json!(1_000)));
    }

    #[test]
    fn serde_shape_matches_store_keys() {
        let json = serde_json::to_value(memory()).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        let mut expected = SessionKey::all_names();
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[test]
    fn record_presence_is_keyed_on_enabled_flag() {
        let mut stored = StoreValues::new();
        assert!(!has_record(&stored));
        stored.insert("isEnabled".into(), json!(true));
        assert!(has_record(&stored));
    }
}
