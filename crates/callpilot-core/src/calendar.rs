//! Free-slot listing over the caller's calendar.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{BusySlot, TimeWindow, TimeWindowSpec};
use crate::error::{Result, SwarmError};

pub const DEFAULT_DAY_START: &str = "09:00";
pub const DEFAULT_DAY_END: &str = "17:00";
pub const DEFAULT_SLOT_MINUTES: i64 = 60;

/// A free `[start, end)` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl std::fmt::Display for FreeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.start.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Window on `date`, defaulting to the working day when a bound is missing.
pub fn day_window(date: &str, start: Option<&str>, end: Option<&str>) -> Result<TimeWindow> {
    TimeWindowSpec::new(
        date,
        start.unwrap_or(DEFAULT_DAY_START),
        end.unwrap_or(DEFAULT_DAY_END),
    )
    .resolve()
}

/// Consecutive `slot_minutes` slots of `window` that overlap no busy interval.
///
/// Slots start at `window.start`; a trailing partial slot is dropped.
pub fn free_slots(
    window: &TimeWindow,
    busy: &[BusySlot],
    slot_minutes: i64,
) -> Result<Vec<FreeSlot>> {
    if slot_minutes <= 0 {
        return Err(SwarmError::InvalidTimeWindow(format!(
            "slot length must be positive, got {slot_minutes} minutes"
        )));
    }
    let step = Duration::minutes(slot_minutes);

    let mut free = Vec::new();
    let mut start = window.start;
    while start + step <= window.end {
        let end = start + step;
        if !busy.iter().any(|b| b.overlaps(start, end)) {
            free.push(FreeSlot { start, end });
        }
        start = end;
    }
    Ok(free)
}
