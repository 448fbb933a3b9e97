//! Wall-clock helpers.

use chrono::Utc;

/// Current Unix time in whole seconds, as the protocol carries it.
pub fn unix_now() -> u32 {
    Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
}
