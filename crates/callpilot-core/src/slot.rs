//! Slot selection: pick at most one offered slot for a provider.
//!
//! Filtering runs in a fixed order: parse, reject busy, reject outside the
//! window, then take the earliest survivor. An empty candidate set is a normal
//! result, not an error.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::request::parse_clock;
use crate::domain::{parse_timestamp, BusySlot, TimeWindow};

/// Parse one offered slot. A bare clock time is placed on `window_date`.
pub fn parse_slot(raw: &str, window_date: Option<NaiveDate>) -> Option<NaiveDateTime> {
    parse_timestamp(raw).or_else(|| {
        let date = window_date?;
        parse_clock(raw).map(|time| date.and_time(time))
    })
}

/// Choose the earliest offered slot that is free and inside `window`.
pub fn select_slot<S: AsRef<str>>(
    offered: &[S],
    window: Option<&TimeWindow>,
    busy: &[BusySlot],
) -> Option<NaiveDateTime> {
    let window_date = window.map(|w| w.date);
    offered
        .iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            let parsed = parse_slot(raw, window_date);
            if parsed.is_none() {
                debug!(slot = %raw, "discarding malformed slot");
            }
            parsed
        })
        .filter(|slot| !busy.iter().any(|b| b.contains(*slot)))
        .filter(|slot| window.map_or(true, |w| w.contains(*slot)))
        .min()
}
