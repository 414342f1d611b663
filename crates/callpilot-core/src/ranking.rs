//! Ranking of negotiation outcomes into a [`SwarmResult`].

use std::cmp::Ordering;

use uuid::Uuid;

use crate::domain::provider::MAX_RATING;
use crate::domain::{NegotiationOutcome, NegotiationStatus, SwarmResult, SwarmStatus};
use crate::scoring::{D_MAX_MILES, NEUTRAL};

/// Rating assumed for ordering when a provider's rating is unknown.
const NEUTRAL_RATING: f64 = NEUTRAL * MAX_RATING;
/// Distance assumed for ordering when a provider's distance is unknown.
const NEUTRAL_DISTANCE: f64 = NEUTRAL * D_MAX_MILES;

fn bucket(status: NegotiationStatus) -> u8 {
    match status {
        NegotiationStatus::Matched => 0,
        NegotiationStatus::NoAvailability => 1,
        NegotiationStatus::Error => 2,
    }
}

/// Order two matched outcomes: score, then rating, then distance.
fn compare_matched(a: &NegotiationOutcome, b: &NegotiationOutcome) -> Ordering {
    let score = |o: &NegotiationOutcome| o.score.unwrap_or(0.0);
    let rating = |o: &NegotiationOutcome| o.provider.known_rating().unwrap_or(NEUTRAL_RATING);
    let distance = |o: &NegotiationOutcome| o.provider.distance_miles.unwrap_or(NEUTRAL_DISTANCE);

    score(b)
        .total_cmp(&score(a))
        .then_with(|| rating(b).total_cmp(&rating(a)))
        .then_with(|| distance(a).total_cmp(&distance(b)))
}

/// Sort `outcomes` and build the swarm result.
///
/// Matched outcomes come first, best first; then `no_availability`, then
/// `error`, each of those in input order. The sort is stable, so equal keys
/// fall back to input order.
pub fn rank(outcomes: Vec<NegotiationOutcome>, swarm_id: Uuid) -> SwarmResult {
    let mut ranked = outcomes;
    ranked.sort_by(|a, b| {
        bucket(a.status)
            .cmp(&bucket(b.status))
            .then_with(|| match (a.is_matched(), b.is_matched()) {
                (true, true) => compare_matched(a, b),
                _ => Ordering::Equal,
            })
    });

    let best = ranked.first().filter(|o| o.is_matched()).cloned();
    let status = if best.is_some() {
        SwarmStatus::Ok
    } else {
        SwarmStatus::NoAvailability
    };

    SwarmResult {
        swarm_id,
        ranked,
        best,
        status,
    }
}
