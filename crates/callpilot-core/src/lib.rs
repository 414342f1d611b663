//! CallPilot core library
//!
//! Negotiates one appointment with many providers at once: each provider is
//! asked for its offered slots, the earliest slot that fits the caller's window
//! and calendar is scored, and the outcomes are ranked into a single result.

pub mod calendar;
pub mod capability;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod metrics;
pub mod negotiator;
pub mod obs;
pub mod orchestrator;
pub mod ranking;
pub mod scoring;
pub mod slot;
pub mod stream;
pub mod telemetry;

pub use calendar::{day_window, free_slots, FreeSlot};
pub use capability::{
    CalendarSource, EmptyCalendar, NullSynthesizer, ProviderDirectory, ProviderLine,
    SimulatedLine, SpeechSynthesizer,
};
pub use config::SwarmConfig;
pub use domain::{
    BookingRequest, BusySlot, NegotiationOutcome, NegotiationStatus, Preferences, Provider,
    ScoreComponents, Service, Speaker, StreamEvent, SwarmResult, SwarmStatus, TimeWindow,
    TimeWindowSpec, TranscriptLine,
};
pub use error::{NegotiationError, Result, SwarmError};
pub use orchestrator::{find_providers, SwarmOrchestrator};
pub use ranking::rank;
pub use scoring::score;
pub use slot::select_slot;
pub use stream::SwarmStream;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
