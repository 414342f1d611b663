//! Per-provider outcomes, the ranked swarm result, and stream events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::Provider;
use crate::error::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Matched,
    NoAvailability,
    Error,
}

impl std::fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationStatus::Matched => write!(f, "matched"),
            NegotiationStatus::NoAvailability => write!(f, "no_availability"),
            NegotiationStatus::Error => write!(f, "error"),
        }
    }
}

/// Who is talking in a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The swarm agent calling on the caller's behalf.
    Agent,
    Provider,
}

/// One line of the synthetic negotiation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
    /// Synthesized speech for agent lines. Transport framing is left to the
    /// request layer, so audio is not serialized.
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

impl TranscriptLine {
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            audio: None,
        }
    }

    pub fn provider(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Provider,
            text: text.into(),
            audio: None,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// The three normalized sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub time_fit: f64,
    pub rating_norm: f64,
    pub distance_norm: f64,
}

/// The result of negotiating with one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub provider: Provider,
    pub status: NegotiationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<NaiveDateTime>,
    pub transcript: Vec<TranscriptLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ScoreComponents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NegotiationOutcome {
    pub fn matched(
        provider: Provider,
        slot: NaiveDateTime,
        score: f64,
        components: ScoreComponents,
        transcript: Vec<TranscriptLine>,
    ) -> Self {
        Self {
            provider,
            status: NegotiationStatus::Matched,
            slot: Some(slot),
            transcript,
            score: Some(score),
            components: Some(components),
            error: None,
        }
    }

    pub fn no_availability(provider: Provider, transcript: Vec<TranscriptLine>) -> Self {
        Self {
            provider,
            status: NegotiationStatus::NoAvailability,
            slot: None,
            transcript,
            score: None,
            components: None,
            error: None,
        }
    }

    pub fn failed(provider: Provider, cause: &NegotiationError) -> Self {
        Self {
            provider,
            status: NegotiationStatus::Error,
            slot: None,
            transcript: Vec::new(),
            score: None,
            components: None,
            error: Some(cause.to_string()),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == NegotiationStatus::Matched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStatus {
    Ok,
    NoAvailability,
}

/// Ranked outcome of one swarm run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmResult {
    /// Identifies the run in logs; not part of equality.
    pub swarm_id: Uuid,
    /// Matched outcomes first, best score first. Same length as the input.
    pub ranked: Vec<NegotiationOutcome>,
    /// The first ranked entry, when it matched.
    pub best: Option<NegotiationOutcome>,
    pub status: SwarmStatus,
}

impl SwarmResult {
    pub fn matched_count(&self) -> usize {
        self.ranked.iter().filter(|o| o.is_matched()).count()
    }

    pub fn count_status(&self, status: NegotiationStatus) -> usize {
        self.ranked.iter().filter(|o| o.status == status).count()
    }
}

impl PartialEq for SwarmResult {
    fn eq(&self, other: &Self) -> bool {
        self.ranked == other.ranked && self.best == other.best && self.status == other.status
    }
}

/// Progress events of a streaming swarm, in completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    NegotiationStarted { provider: Provider },
    NegotiationCompleted { outcome: NegotiationOutcome },
    NegotiationFailed { provider: Provider, error: String },
    Summary { result: SwarmResult },
}

impl StreamEvent {
    /// Event announcing that `outcome` finished: `failed` for error outcomes,
    /// `completed` otherwise.
    pub fn finished(outcome: NegotiationOutcome) -> Self {
        if outcome.status == NegotiationStatus::Error {
            let error = outcome
                .error
                .unwrap_or_else(|| "negotiation failed".to_string());
            return StreamEvent::NegotiationFailed {
                provider: outcome.provider,
                error,
            };
        }
        StreamEvent::NegotiationCompleted { outcome }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, StreamEvent::Summary { .. })
    }

    /// Provider id for per-provider events.
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            StreamEvent::NegotiationStarted { provider }
            | StreamEvent::NegotiationFailed { provider, .. } => Some(&provider.id),
            StreamEvent::NegotiationCompleted { outcome } => Some(&outcome.provider.id),
            StreamEvent::Summary { .. } => None,
        }
    }
}
