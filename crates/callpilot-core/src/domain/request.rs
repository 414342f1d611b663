//! Booking requests and their validation.
//!
//! A [`BookingRequest`] is what the caller hands in, with the window still as
//! raw wall-clock strings. [`BookingRequest::validate`] turns it into a
//! [`ValidatedRequest`] once, before any provider work is dispatched, so every
//! input error is reported exactly once at the request level.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwarmError};

/// Service categories the swarm knows how to negotiate for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Dentist,
    AutoRepair,
    Doctor,
    Hairdresser,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Dentist,
        Service::AutoRepair,
        Service::Doctor,
        Service::Hairdresser,
    ];

    /// Identifier used in provider records and requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Dentist => "dentist",
            Service::AutoRepair => "auto_repair",
            Service::Doctor => "doctor",
            Service::Hairdresser => "hairdresser",
        }
    }

    /// Wording used in spoken transcript lines.
    pub fn spoken(&self) -> &'static str {
        match self {
            Service::Dentist => "a dental appointment",
            Service::AutoRepair => "a car repair appointment",
            Service::Doctor => "a doctor's appointment",
            Service::Hairdresser => "a haircut appointment",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Service::ALL
            .into_iter()
            .find(|svc| svc.as_str() == wanted)
            .ok_or_else(|| SwarmError::UnsupportedService {
                service: s.to_string(),
            })
    }
}

/// Time window exactly as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowSpec {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    pub start: String,
    /// `HH:MM` or `HH:MM:SS`
    pub end: String,
}

impl TimeWindowSpec {
    pub fn new(date: &str, start: &str, end: &str) -> Self {
        Self {
            date: date.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Parse the raw strings into a [`TimeWindow`].
    pub fn resolve(&self) -> Result<TimeWindow> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|e| {
            SwarmError::InvalidTimeWindow(format!("date '{}': {e}", self.date))
        })?;
        let start = parse_clock(&self.start)
            .ok_or_else(|| SwarmError::InvalidTimeWindow(format!("start '{}'", self.start)))?;
        let end = parse_clock(&self.end)
            .ok_or_else(|| SwarmError::InvalidTimeWindow(format!("end '{}'", self.end)))?;
        TimeWindow::new(date, start, end)
    }
}

/// Parse a wall-clock `HH:MM[:SS]` value.
pub(crate) fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// A resolved window on a single local date. Bounds are inclusive for slot
/// filtering: a slot exactly at `end` is still inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Returns [`SwarmError::InvalidTimeWindow`] unless `start < end`.
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(SwarmError::InvalidTimeWindow(format!(
                "start {} is not before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        Ok(Self {
            date,
            start: date.and_time(start),
            end: date.and_time(end),
        })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} between {} and {}",
            self.date.format("%A, %B %-d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Relative importance of the three score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub time_weight: f64,
    pub rating_weight: f64,
    pub distance_weight: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            time_weight: 0.6,
            rating_weight: 0.2,
            distance_weight: 0.2,
        }
    }
}

impl Preferences {
    pub fn new(time_weight: f64, rating_weight: f64, distance_weight: f64) -> Self {
        Self {
            time_weight,
            rating_weight,
            distance_weight,
        }
    }

    /// Weights must be finite and non-negative. They need not sum to one.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("time_weight", self.time_weight),
            ("rating_weight", self.rating_weight),
            ("distance_weight", self.distance_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SwarmError::InvalidPreferences(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A caller's request to book one appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service: String,
    #[serde(default)]
    pub time_window: Option<TimeWindowSpec>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Result limit, applied by the provider directory.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl BookingRequest {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            time_window: None,
            preferences: Preferences::default(),
            limit: None,
        }
    }

    pub fn with_window(mut self, date: &str, start: &str, end: &str) -> Self {
        self.time_window = Some(TimeWindowSpec::new(date, start, end));
        self
    }

    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check every request-level input and resolve the window.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let service: Service = self.service.parse()?;
        let window = self
            .time_window
            .as_ref()
            .map(TimeWindowSpec::resolve)
            .transpose()?;
        self.preferences.validate()?;
        Ok(ValidatedRequest {
            service,
            window,
            preferences: self.preferences,
        })
    }
}

/// A request that passed validation; shared read-only by every negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub service: Service,
    pub window: Option<TimeWindow>,
    pub preferences: Preferences,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_parse_is_case_insensitive() {
        assert_eq!("Dentist".parse::<Service>().unwrap(), Service::Dentist);
        assert_eq!(" auto_repair ".parse::<Service>().unwrap(), Service::AutoRepair);
        let err = "plumber".parse::<Service>().unwrap_err();
        assert!(matches!(err, SwarmError::UnsupportedService { .. }));
    }

    #[test]
    fn test_window_resolves_on_its_date() {
        let window = TimeWindowSpec::new("2026-02-08", "13:00", "17:00")
            .resolve()
            .unwrap();
        assert_eq!(window.start.to_string(), "2026-02-08 13:00:00");
        assert_eq!(window.end.to_string(), "2026-02-08 17:00:00");
        assert_eq!(window.duration().num_minutes(), 240);
        assert!(window.contains(window.end));
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let err = TimeWindowSpec::new("2026-02-08", "17:00", "13:00")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SwarmError::InvalidTimeWindow(_)));

        let err = TimeWindowSpec::new("2026-02-08", "13:00", "13:00")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, SwarmError::InvalidTimeWindow(_)));
    }

    #[test]
    fn test_malformed_window_fields_are_rejected() {
        for spec in [
            TimeWindowSpec::new("08/02/2026", "13:00", "17:00"),
            TimeWindowSpec::new("2026-02-08", "1pm", "17:00"),
            TimeWindowSpec::new("2026-02-08", "13:00", ""),
        ] {
            assert!(spec.resolve().is_err(), "{spec:?} should not resolve");
        }
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let request = BookingRequest::new("dentist").with_preferences(Preferences::new(
            -0.1, 0.5, 0.5,
        ));
        assert!(matches!(
            request.validate(),
            Err(SwarmError::InvalidPreferences(_))
        ));

        let request = BookingRequest::new("dentist")
            .with_preferences(Preferences::new(f64::NAN, 0.5, 0.5));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: BookingRequest = serde_json::from_value(serde_json::json!({
            "service": "dentist",
            "time_window": {"date": "2026-02-08", "start": "13:00", "end": "17:00"}
        }))
        .unwrap();
        assert_eq!(request.preferences, Preferences::default());
        assert_eq!(request.limit, None);

        let validated = request.validate().unwrap();
        assert_eq!(validated.service, Service::Dentist);
        assert!(validated.window.is_some());
    }
}
