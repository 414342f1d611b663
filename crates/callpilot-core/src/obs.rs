//! Structured observability hooks for swarm lifecycle events.
//!
//! This module provides:
//! - A swarm-scoped tracing span, attached to the run with `Instrument`
//! - Emission functions for key lifecycle events: swarm start, per-provider
//!   finish or timeout, calendar fallback, swarm finish
//!
//! Events are emitted at `info!` level, failures at `warn!`. Filtering is
//! controlled through `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::domain::{NegotiationStatus, Service};

/// Span tagging every log line of one swarm run with its id.
///
/// # Example
///
/// ```ignore
/// async { /* dispatch */ }.instrument(swarm_span(id, Service::Dentist)).await;
/// ```
pub fn swarm_span(swarm_id: Uuid, service: Service) -> Span {
    tracing::info_span!("callpilot.swarm", swarm_id = %swarm_id, service = %service)
}

/// Emit event: swarm dispatched to `providers` candidates.
pub fn emit_swarm_started(swarm_id: Uuid, providers: usize, streaming: bool) {
    info!(
        event = "swarm.started",
        swarm_id = %swarm_id,
        providers = providers,
        streaming = streaming,
    );
}

/// Emit event: a single provider's negotiation finished.
pub fn emit_negotiation_finished(
    provider_id: &str,
    status: NegotiationStatus,
    score: Option<f64>,
    duration_ms: u64,
) {
    info!(
        event = "negotiation.finished",
        provider_id = %provider_id,
        status = %status,
        score = score.unwrap_or(0.0),
        duration_ms = duration_ms,
    );
}

/// Emit event: a provider missed its deadline (warning level).
pub fn emit_negotiation_timed_out(provider_id: &str, timeout_ms: u64) {
    warn!(
        event = "negotiation.timed_out",
        provider_id = %provider_id,
        timeout_ms = timeout_ms,
    );
}

/// Emit event: busy intervals could not be loaded; the run continues with an
/// empty calendar (warning level).
pub fn emit_calendar_unavailable(error: &dyn std::fmt::Display) {
    warn!(event = "calendar.unavailable", error = %error);
}

/// Emit event: swarm ranked and finished.
pub fn emit_swarm_finished(
    swarm_id: Uuid,
    total: usize,
    matched: usize,
    best_provider: Option<&str>,
    duration_ms: u64,
) {
    info!(
        event = "swarm.finished",
        swarm_id = %swarm_id,
        total = total,
        matched = matched,
        best_provider = best_provider.unwrap_or("none"),
        duration_ms = duration_ms,
    );
}
