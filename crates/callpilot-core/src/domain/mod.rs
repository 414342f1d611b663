//! Data model shared by every stage of the swarm.
//!
//! - [`request`]: `BookingRequest`, `Preferences`, `TimeWindow`, `Service`
//! - [`provider`]: `Provider`, `BusySlot`
//! - [`outcome`]: `NegotiationOutcome`, `SwarmResult`, `StreamEvent`

pub mod outcome;
pub mod provider;
pub mod request;

pub use outcome::{
    NegotiationOutcome, NegotiationStatus, ScoreComponents, Speaker, StreamEvent, SwarmResult,
    SwarmStatus, TranscriptLine,
};
pub use provider::{parse_timestamp, BusySlot, Provider};
pub use request::{
    BookingRequest, Preferences, Service, TimeWindow, TimeWindowSpec, ValidatedRequest,
};
