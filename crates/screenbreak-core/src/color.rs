//! Display color temperature by time of day.
//!
//! A fixed lookup from the local wall-clock hour to a Kelvin value. It has no
//! state of its own; the coordinator recomputes it on every periodic tick.

use crate::clock::Clock;

/// Morning, 06:00 to 10:00.
pub const MORNING_KELVIN: u32 = 6000;
/// Midday, 10:00 to 17:00.
pub const MIDDAY_KELVIN: u32 = 5000;
/// Evening, 17:00 to 21:00.
pub const EVENING_KELVIN: u32 = 4000;
/// Night, 21:00 to 06:00.
pub const NIGHT_KELVIN: u32 = 2700;

/// Kelvin value for a local hour (0..=23).
pub fn color_temperature_for_hour(hour: u32) -> u32 {
    match hour {
        6..=9 => MORNING_KELVIN,
        10..=16 => MIDDAY_KELVIN,
        17..=20 => EVENING_KELVIN,
        _ => NIGHT_KELVIN,
    }
}

pub fn current_color_temperature(clock: &dyn Clock) -> u32 {
    color_temperature_for_hour(clock.local_hour())
}
