//! Caller calendar backed by a `calendar.json` file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use callpilot_core::capability::CalendarSource;
use callpilot_core::{BusySlot, Result, SwarmError};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
struct CalendarFile {
    #[serde(default)]
    user_calendar: UserCalendar,
}

#[derive(Debug, Default, Deserialize)]
struct UserCalendar {
    #[serde(default)]
    busy_slots: Vec<RawBusySlot>,
}

#[derive(Debug, Deserialize)]
struct RawBusySlot {
    start: String,
    end: String,
}

/// Reads `{"user_calendar": {"busy_slots": [{"start", "end"}]}}`.
///
/// A missing file is an empty calendar. Entries whose bounds do not parse, or
/// that end before they start, are skipped with a warning.
#[derive(Debug, Clone)]
pub struct JsonCalendar {
    path: PathBuf,
}

impl JsonCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CalendarSource for JsonCalendar {
    async fn busy_intervals(&self) -> Result<Vec<BusySlot>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file: CalendarFile = serde_json::from_str(&raw).map_err(|e| {
            SwarmError::Calendar(format!("invalid calendar {}: {e}", self.path.display()))
        })?;

        let busy = file
            .user_calendar
            .busy_slots
            .into_iter()
            .filter_map(|slot| {
                let parsed = BusySlot::parse(&slot.start, &slot.end);
                if parsed.is_none() {
                    warn!(start = %slot.start, end = %slot.end, "skipping unusable busy slot");
                }
                parsed
            })
            .collect();
        Ok(busy)
    }
}
