//! Collaborator adapters for the CallPilot swarm.
//!
//! File-backed provider directory and calendar, and an HTTP speech
//! synthesizer. Each implements a trait from `callpilot_core::capability`.

pub mod calendar;
pub mod directory;
pub mod error;
pub mod speech;

pub use calendar::JsonCalendar;
pub use directory::JsonProviderDirectory;
pub use error::{SpeechError, SpeechResult};
pub use speech::{synthesizer_for, synthesizer_from_env, ElevenLabsSynthesizer, SpeechConfig};
