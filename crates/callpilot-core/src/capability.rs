//! Collaborator seams consumed by the swarm.
//!
//! Implement these traits to plug in real directories, calendars, telephony
//! or speech engines; [`crate::fakes`] has in-memory versions for tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BusySlot, Provider};
use crate::error::{NegotiationResult, Result};

/// Source of candidate providers for a service.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Providers offering `service`, truncated to `limit` when given.
    async fn list_providers(&self, service: &str, limit: Option<usize>) -> Result<Vec<Provider>>;
}

/// Source of the caller's existing commitments.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn busy_intervals(&self) -> Result<Vec<BusySlot>>;
}

/// Calendar with no commitments.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyCalendar;

#[async_trait]
impl CalendarSource for EmptyCalendar {
    async fn busy_intervals(&self) -> Result<Vec<BusySlot>> {
        Ok(Vec::new())
    }
}

/// Optional text-to-speech capability.
///
/// Implementations are best-effort: any failure is reported as `None`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>>;
}

/// Synthesizer used when no speech engine is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    async fn synthesize(&self, _text: &str) -> Option<Vec<u8>> {
        None
    }
}

/// The line used to "call" a provider and hear which slots it offers.
#[async_trait]
pub trait ProviderLine: Send + Sync {
    async fn offered_slots(&self, provider: &Provider) -> NegotiationResult<Vec<String>>;
}

/// Answers with the provider record's own availability after a fixed delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedLine {
    latency: Duration,
}

impl SimulatedLine {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl ProviderLine for SimulatedLine {
    async fn offered_slots(&self, provider: &Provider) -> NegotiationResult<Vec<String>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(provider.availability.clone())
    }
}
