//! Multi-criteria scoring of a matched slot.
//!
//! Each component lies in `[0, 1]`; the final score is their weighted mean
//! with the caller's weights normalized to sum to one.

use chrono::NaiveDateTime;

use crate::domain::provider::MAX_RATING;
use crate::domain::{Preferences, Provider, ScoreComponents, TimeWindow};

/// Reference distance at which `distance_norm` reaches zero.
pub const D_MAX_MILES: f64 = 10.0;

/// Component value used when the provider record carries no data.
pub const NEUTRAL: f64 = 0.5;

/// A final score together with the components it was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub components: ScoreComponents,
}

/// Weights normalized so they sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedWeights {
    pub time: f64,
    pub rating: f64,
    pub distance: f64,
}

impl From<&Preferences> for NormalizedWeights {
    fn from(p: &Preferences) -> Self {
        let weights = [p.time_weight, p.rating_weight, p.distance_weight];
        let max = weights.into_iter().fold(0.0_f64, f64::max);
        if !max.is_finite() || max <= 0.0 || weights.iter().any(|w| w.is_nan()) {
            let third = 1.0 / 3.0;
            return Self {
                time: third,
                rating: third,
                distance: third,
            };
        }
        // The raw sum of large finite weights can overflow.
        let [time, rating, distance] = weights.map(|w| w / max);
        let sum = time + rating + distance;
        Self {
            time: time / sum,
            rating: rating / sum,
            distance: distance / sum,
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub fn rating_norm(rating: Option<f64>) -> f64 {
    match rating.filter(|r| *r > 0.0) {
        Some(r) => unit(r / MAX_RATING),
        None => NEUTRAL,
    }
}

pub fn distance_norm(distance_miles: Option<f64>) -> f64 {
    match distance_miles {
        Some(d) => unit(1.0 - d / D_MAX_MILES),
        None => NEUTRAL,
    }
}

/// Earlier in the window scores higher, decaying linearly to zero at the end.
/// Without a window the single selected slot fits perfectly.
pub fn time_fit(slot: NaiveDateTime, window: Option<&TimeWindow>) -> f64 {
    let Some(window) = window else {
        return 1.0;
    };
    let duration = window.duration().num_seconds() as f64;
    if duration <= 0.0 {
        return 1.0;
    }
    let offset = (slot - window.start).num_seconds() as f64;
    unit(1.0 - offset / duration)
}

/// Score a provider's selected slot.
pub fn score(
    slot: NaiveDateTime,
    window: Option<&TimeWindow>,
    provider: &Provider,
    preferences: &Preferences,
) -> Score {
    let components = ScoreComponents {
        time_fit: time_fit(slot, window),
        rating_norm: rating_norm(provider.rating),
        distance_norm: distance_norm(provider.distance_miles),
    };
    let w = NormalizedWeights::from(preferences);
    let value = unit(
        w.time * components.time_fit
            + w.rating * components.rating_norm
            + w.distance * components.distance_norm,
    );
    Score { value, components }
}
