//! Per-provider negotiation.
//!
//! A negotiation never returns an error: every failure mode is folded into the
//! returned [`NegotiationOutcome`]. Panics and deadlines are handled one level
//! up by the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::capability::{ProviderLine, SpeechSynthesizer};
use crate::domain::{
    BusySlot, NegotiationOutcome, Provider, Speaker, TranscriptLine, ValidatedRequest,
};
use crate::scoring;
use crate::slot::select_slot;

/// Everything a negotiation reads. Shared, read-only, by all units of a swarm.
pub struct NegotiationContext {
    pub request: ValidatedRequest,
    pub busy: Arc<[BusySlot]>,
    pub line: Arc<dyn ProviderLine>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl NegotiationContext {
    pub fn new(
        request: ValidatedRequest,
        busy: Vec<BusySlot>,
        line: Arc<dyn ProviderLine>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            request,
            busy: busy.into(),
            line,
            synthesizer,
        }
    }
}

/// Time kept back from a negotiation deadline when voicing the transcript.
pub const SPEECH_MARGIN: Duration = Duration::from_millis(250);

/// Negotiate one slot with `provider`.
pub async fn negotiate_with(ctx: &NegotiationContext, provider: &Provider) -> NegotiationOutcome {
    negotiate(ctx, provider, None).await
}

/// Negotiate one slot with `provider`, voicing the transcript only while
/// there is time left before `deadline`. Late audio is dropped.
pub async fn negotiate_until(
    ctx: &NegotiationContext,
    provider: &Provider,
    deadline: Instant,
) -> NegotiationOutcome {
    negotiate(ctx, provider, Some(deadline)).await
}

#[instrument(skip_all, fields(provider_id = %provider.id))]
async fn negotiate(
    ctx: &NegotiationContext,
    provider: &Provider,
    deadline: Option<Instant>,
) -> NegotiationOutcome {
    if let Err(cause) = provider.check() {
        return NegotiationOutcome::failed(provider.clone(), &cause);
    }

    let offered = match ctx.line.offered_slots(provider).await {
        Ok(slots) => slots,
        Err(cause) => return NegotiationOutcome::failed(provider.clone(), &cause),
    };

    let window = ctx.request.window.as_ref();
    let Some(slot) = select_slot(&offered, window, &ctx.busy) else {
        debug!(offered = offered.len(), "no usable slot");
        let mut transcript = refusal_transcript(provider, &ctx.request);
        voice_before(ctx.synthesizer.as_ref(), &mut transcript, deadline).await;
        return NegotiationOutcome::no_availability(provider.clone(), transcript);
    };

    let score = scoring::score(slot, window, provider, &ctx.request.preferences);
    let mut transcript = booking_transcript(provider, &ctx.request, slot);
    voice_before(ctx.synthesizer.as_ref(), &mut transcript, deadline).await;

    debug!(slot = %slot, score = score.value, "slot matched");
    NegotiationOutcome::matched(
        provider.clone(),
        slot,
        score.value,
        score.components,
        transcript,
    )
}

fn greeting(provider: &Provider) -> TranscriptLine {
    TranscriptLine::agent(format!(
        "Hi {}, this is CallPilot calling on behalf of a client.",
        provider.name
    ))
}

fn request_line(request: &ValidatedRequest) -> TranscriptLine {
    let service = request.service.spoken();
    match &request.window {
        Some(window) => TranscriptLine::agent(format!("I'd like to book {service} on {window}.")),
        None => TranscriptLine::agent(format!(
            "I'd like to book {service} at your earliest availability."
        )),
    }
}

fn spoken_slot(slot: NaiveDateTime) -> String {
    slot.format("%A, %B %-d at %H:%M").to_string()
}

/// Greeting, request, offer, acceptance, confirmation.
pub fn booking_transcript(
    provider: &Provider,
    request: &ValidatedRequest,
    slot: NaiveDateTime,
) -> Vec<TranscriptLine> {
    let when = spoken_slot(slot);
    vec![
        greeting(provider),
        request_line(request),
        TranscriptLine::provider(format!("We can see you on {when}.")),
        TranscriptLine::agent("That works. Please book it under my client's name."),
        TranscriptLine::provider(format!("You're all set for {when}. See you then!")),
    ]
}

/// Greeting, request, refusal, sign-off.
pub fn refusal_transcript(provider: &Provider, request: &ValidatedRequest) -> Vec<TranscriptLine> {
    let refusal = match &request.window {
        Some(window) => format!("I'm sorry, we don't have anything open on {window}."),
        None => "I'm sorry, we don't have any openings right now.".to_string(),
    };
    vec![
        greeting(provider),
        request_line(request),
        TranscriptLine::provider(refusal),
        TranscriptLine::agent("Understood, thank you for your time."),
    ]
}

/// Voice the transcript, giving up at `deadline` minus [`SPEECH_MARGIN`].
/// On expiry every line is left without audio.
async fn voice_before(
    synthesizer: &dyn SpeechSynthesizer,
    transcript: &mut [TranscriptLine],
    deadline: Option<Instant>,
) {
    let Some(deadline) = deadline else {
        voice_agent_lines(synthesizer, transcript).await;
        return;
    };
    let budget = deadline
        .saturating_duration_since(Instant::now())
        .saturating_sub(SPEECH_MARGIN);
    let mut voiced = transcript.to_vec();
    match tokio::time::timeout(budget, voice_agent_lines(synthesizer, &mut voiced)).await {
        Ok(()) => transcript.clone_from_slice(&voiced),
        Err(_) => warn!(
            budget_ms = budget.as_millis() as u64,
            "speech synthesis too slow, audio dropped"
        ),
    }
}

/// Attach synthesized audio to agent lines. Provider lines are never voiced.
async fn voice_agent_lines(synthesizer: &dyn SpeechSynthesizer, transcript: &mut [TranscriptLine]) {
    let agent_lines: Vec<&mut TranscriptLine> = transcript
        .iter_mut()
        .filter(|line| line.speaker == Speaker::Agent)
        .collect();
    let audio = join_all(
        agent_lines
            .iter()
            .map(|line| synthesizer.synthesize(&line.text)),
    )
    .await;
    for (line, audio) in agent_lines.into_iter().zip(audio) {
        line.audio = audio;
    }
}
