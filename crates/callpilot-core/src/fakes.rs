//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides directories, calendars, provider lines and synthesizers that
//! satisfy the trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::capability::{CalendarSource, ProviderDirectory, ProviderLine, SpeechSynthesizer};
use crate::domain::{BusySlot, Provider};
use crate::error::{NegotiationError, NegotiationResult, Result, SwarmError};

// ---------------------------------------------------------------------------
// StaticDirectory
// ---------------------------------------------------------------------------

/// Directory over a fixed provider list.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    providers: Vec<Provider>,
}

impl StaticDirectory {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ProviderDirectory for StaticDirectory {
    async fn list_providers(&self, service: &str, limit: Option<usize>) -> Result<Vec<Provider>> {
        let limit = limit.filter(|n| *n > 0).unwrap_or(usize::MAX);
        let matching = self
            .providers
            .iter()
            .filter(|p| p.service == service)
            .take(limit)
            .cloned()
            .collect();
        Ok(matching)
    }
}

// ---------------------------------------------------------------------------
// Calendars
// ---------------------------------------------------------------------------

/// Calendar with a fixed set of busy intervals.
#[derive(Debug, Default)]
pub struct StaticCalendar {
    busy: Vec<BusySlot>,
}

impl StaticCalendar {
    pub fn new(busy: Vec<BusySlot>) -> Self {
        Self { busy }
    }
}

#[async_trait]
impl CalendarSource for StaticCalendar {
    async fn busy_intervals(&self) -> Result<Vec<BusySlot>> {
        Ok(self.busy.clone())
    }
}

/// Calendar whose backing store is always unavailable.
#[derive(Debug, Default)]
pub struct FailingCalendar;

#[async_trait]
impl CalendarSource for FailingCalendar {
    async fn busy_intervals(&self) -> Result<Vec<BusySlot>> {
        Err(SwarmError::Calendar("calendar backend offline".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Provider lines
// ---------------------------------------------------------------------------

/// Line that cannot reach anyone.
#[derive(Debug)]
pub struct FailingLine {
    reason: String,
}

impl FailingLine {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ProviderLine for FailingLine {
    async fn offered_slots(&self, _provider: &Provider) -> NegotiationResult<Vec<String>> {
        Err(NegotiationError::Unreachable(self.reason.clone()))
    }
}

/// What a [`ScriptedLine`] does for one provider.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with the record's availability after a delay.
    Answer(Duration),
    /// Fail with `Unreachable` after a delay.
    Fail(Duration, String),
    /// Panic when called.
    Panic,
}

/// Line scripted per provider id. Unscripted providers answer immediately.
#[derive(Debug, Default)]
pub struct ScriptedLine {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, provider_id: &str, script: Script) -> Self {
        self.scripts.insert(provider_id.to_string(), script);
        self
    }

    /// Provider ids in the order they were called.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderLine for ScriptedLine {
    async fn offered_slots(&self, provider: &Provider) -> NegotiationResult<Vec<String>> {
        self.calls.lock().unwrap().push(provider.id.clone());
        match self.scripts.get(&provider.id) {
            None => Ok(provider.availability.clone()),
            Some(Script::Answer(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(provider.availability.clone())
            }
            Some(Script::Fail(delay, reason)) => {
                tokio::time::sleep(*delay).await;
                Err(NegotiationError::Unreachable(reason.clone()))
            }
            Some(Script::Panic) => panic!("line exploded for {}", provider.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesizers
// ---------------------------------------------------------------------------

/// Synthesizer that returns the text's bytes and remembers what it voiced.
#[derive(Debug, Default)]
pub struct RecordingSynthesizer {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_string());
        Some(text.as_bytes().to_vec())
    }
}

/// Synthesizer that answers with the text's bytes after a fixed delay.
#[derive(Debug)]
pub struct SlowSynthesizer {
    delay: Duration,
}

impl SlowSynthesizer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SpeechSynthesizer for SlowSynthesizer {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Some(text.as_bytes().to_vec())
    }
}

/// Synthesizer that breaks its best-effort contract by panicking.
#[derive(Debug, Default)]
pub struct PanickingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for PanickingSynthesizer {
    async fn synthesize(&self, _text: &str) -> Option<Vec<u8>> {
        panic!("speech engine crashed")
    }
}
