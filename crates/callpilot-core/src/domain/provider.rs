//! Provider records and caller busy intervals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{NegotiationError, NegotiationResult};

/// Highest rating a provider can carry.
pub const MAX_RATING: f64 = 5.0;

/// A business that can be asked for an appointment slot.
///
/// The record is read-only for the swarm; it is cloned into each outcome so
/// results stay self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub service: String,
    /// 0 or absent means the rating is unknown.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub distance_miles: Option<f64>,
    /// Offered slots, `YYYY-MM-DD HH:MM` in local time.
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl Provider {
    pub fn new(id: &str, name: &str, service: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            service: service.to_string(),
            rating: None,
            distance_miles: None,
            availability: Vec::new(),
            open_now: None,
            phone: None,
            address: None,
            place_id: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_distance(mut self, miles: f64) -> Self {
        self.distance_miles = Some(miles);
        self
    }

    pub fn with_slots<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability = slots.into_iter().map(Into::into).collect();
        self
    }

    /// The rating, unless it is absent or zero.
    pub fn known_rating(&self) -> Option<f64> {
        self.rating.filter(|r| *r > 0.0)
    }

    /// Reject records the scorer cannot reason about.
    pub fn check(&self) -> NegotiationResult<()> {
        if self.id.trim().is_empty() {
            return Err(NegotiationError::MalformedProvider(format!(
                "provider '{}' has no id",
                self.name
            )));
        }
        if let Some(rating) = self.rating {
            if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
                return Err(NegotiationError::MalformedProvider(format!(
                    "rating {rating} outside [0, {MAX_RATING}]"
                )));
            }
        }
        if let Some(distance) = self.distance_miles {
            if !distance.is_finite() || distance < 0.0 {
                return Err(NegotiationError::MalformedProvider(format!(
                    "distance {distance} is not a non-negative number of miles"
                )));
            }
        }
        Ok(())
    }
}

/// Parse a local `date time` stamp as used by provider availability and
/// calendars. Accepts a space or `T` separator, with or without seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// A half-open `[start, end)` commitment on the caller's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusySlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BusySlot {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Parse both bounds with [`parse_timestamp`]; `None` if either fails or
    /// the interval is empty.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;
        (start < end).then_some(Self { start, end })
    }

    /// `start <= at < end`
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// True if `[start, end)` intersects this interval.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < self.end && end > self.start
    }
}
