//! Request/response protocol at the coordinator boundary.
//!
//! Requests are JSON objects discriminated by `action`; responses are flat
//! JSON objects in camelCase. Failed actions answer `{success: false, error}`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    StartBreak,
    SnoozeBreak,
    #[serde(rename_all = "camelCase")]
    ToggleEnabled {
        is_enabled: bool,
    },
    GetStats,
}

impl Request {
    /// Parse one request line. Unknown actions are reported as such.
    pub fn parse(line: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "action".into(),
                message: "missing or not a string".into(),
            })?;
        match action {
            "startBreak" | "snoozeBreak" | "toggleEnabled" | "getStats" => {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ValidationError::InvalidValue {
                        field: action.to_string(),
                        message: e.to_string(),
                    }
                    .into()
                })
            }
            other => Err(ValidationError::UnknownAction(other.to_string()).into()),
        }
    }
}

/// Remaining time until the next reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextBreakIn {
    pub minutes: u64,
    pub seconds: u64,
    pub total_seconds: u64,
}

impl NextBreakIn {
    /// A whole untouched interval.
    pub fn full(interval_min: u64) -> Self {
        Self {
            minutes: interval_min,
            seconds: 0,
            total_seconds: interval_min.saturating_mul(60),
        }
    }

    /// `max(0, interval - (now - last_break))`. A zero `last_break_ms`
    /// counts as "just now"; a last break in the future counts as no time
    /// elapsed.
    pub fn remaining(interval_min: u64, last_break_ms: u64, now_ms: u64) -> Self {
        let last_break_ms = if last_break_ms == 0 {
            now_ms
        } else {
            last_break_ms
        };
        let elapsed_ms = now_ms.saturating_sub(last_break_ms);
        let interval_ms = interval_min.saturating_mul(60_000);
        let remaining_ms = interval_ms.saturating_sub(elapsed_ms);
        Self {
            minutes: remaining_ms / 60_000,
            seconds: (remaining_ms % 60_000) / 1000,
            total_seconds: (remaining_ms + 500) / 1000,
        }
    }

    /// `MM:SS`, as the popup shows it.
    pub fn clock_face(&self) -> String {
        format!("{:02}:{:02}", self.minutes, self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBreakResponse {
    pub success: bool,
    pub break_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub success: bool,
    pub is_enabled: bool,
    pub next_break_in: NextBreakIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub is_enabled: bool,
    pub break_count: u64,
    pub total_screen_time: u64,
    pub last_break_time: u64,
    pub color_temp: u32,
    pub next_break_in: NextBreakIn,
    pub is_break_active: bool,
    /// Set when the store could not be read and memory values were used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

impl Failure {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

/// Every answer the coordinator gives.
///
/// Variant order matters when decoding: the bare `{success}` shape of a
/// snooze answer would also match a failure, so it is tried last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    StartBreak(StartBreakResponse),
    Toggle(ToggleResponse),
    Stats(StatsResponse),
    Failure(Failure),
    Snooze(SnoozeResponse),
}

impl Response {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        Response::Failure(Failure::new(error))
    }

    /// False only for failures; stats always count as answered.
    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_action_tag() {
        let req: Request = serde_json::from_value(json!({"action": "toggleEnabled", "isEnabled": false})).unwrap();
        assert_eq!(req, Request::ToggleEnabled { is_enabled: false });
        let req: Request = serde_json::from_value(json!({"action": "getStats"})).unwrap();
        assert_eq!(req, Request::GetStats);
        assert_eq!(
            serde_json::to_value(Request::SnoozeBreak).unwrap(),
            json!({"action": "snoozeBreak"})
        );
    }

    #[test]
    fn parse_reports_unknown_action() {
        let err = Request::parse(r#"{"action":"dance"}"#).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownAction(ref a)) if a == "dance"
        ));
    }

    #[test]
    fn parse_reports_missing_toggle_field() {
        let err = Request::parse(r#"{"action":"toggleEnabled"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidValue { .. })));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(Request::parse("not json"), Err(CoreError::Json(_))));
    }

    #[test]
    fn remaining_after_five_minutes_is_fifteen() {
        let now = 10_000_000;
        let next = NextBreakIn::remaining(20, now - 5 * 60_000, now);
        assert_eq!((next.minutes, next.seconds, next.total_seconds), (15, 0, 900));
    }

    #[test]
    fn remaining_truncates_seconds_and_clamps_at_zero() {
        let now = 10_000_000;
        let next = NextBreakIn::remaining(20, now - 90_500, now);
        assert_eq!((next.minutes, next.seconds), (18, 29));
        assert_eq!(next.total_seconds, 1110);

        let overdue = NextBreakIn::remaining(20, now - 30 * 60_000, now);
        assert_eq!(overdue, NextBreakIn { minutes: 0, seconds: 0, total_seconds: 0 });
    }

    #[test]
    fn remaining_treats_missing_timestamp_as_now() {
        assert_eq!(NextBreakIn::remaining(20, 0, 5_000), NextBreakIn::full(20));
    }

    #[test]
    fn responses_serialize_flat() {
        let resp = Response::StartBreak(StartBreakResponse { success: true, break_count: 3 });
        assert_eq!(serde_json::to_value(resp).unwrap(), json!({"success": true, "breakCount": 3}));

        let failure = Response::failure("store offline");
        assert_eq!(
            serde_json::to_value(failure).unwrap(),
            json!({"success": false, "error": "store offline"})
        );
    }

    #[test]
    fn responses_decode_to_the_right_shape() {
        let failure: Response = serde_json::from_value(json!({"success": false, "error": "x"})).unwrap();
        assert!(!failure.is_success());
        let snooze: Response = serde_json::from_value(json!({"success": true})).unwrap();
        assert_eq!(snooze, Response::Snooze(SnoozeResponse { success: true }));
    }

    #[test]
    fn stats_omit_error_when_healthy() {
        let stats = StatsResponse {
            is_enabled: true,
            break_count: 1,
            total_screen_time: 2,
            last_break_time: 3,
            color_temp: 5000,
            next_break_in: NextBreakIn::full(20),
            is_break_active: false,
            error: None,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["nextBreakIn"], json!({"minutes": 20, "seconds": 0, "totalSeconds": 1200}));
    }

    #[test]
    fn clock_face_pads_digits() {
        let next = NextBreakIn { minutes: 4, seconds: 7, total_seconds: 247 };
        assert_eq!(next.clock_face(), "04:07");
    }
}
