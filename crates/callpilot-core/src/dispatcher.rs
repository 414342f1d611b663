//! Concurrent fan-out of negotiations.
//!
//! One task per provider runs on a [`JoinSet`], optionally gated by a
//! semaphore. Each task is isolated: a panic is caught, a deadline is enforced,
//! and the outcome is returned together with the provider's input index so it
//! lands in its own pre-sized slot. Nothing is shared mutably between tasks.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{warn, Instrument};

use crate::domain::{NegotiationOutcome, Provider, StreamEvent};
use crate::error::NegotiationError;
use crate::metrics::METRICS;
use crate::negotiator::{negotiate_until, NegotiationContext};
use crate::obs::{emit_negotiation_finished, emit_negotiation_timed_out};

/// Limits applied to one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// `None` launches every provider at once.
    pub max_concurrency: Option<usize>,
    pub provider_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            provider_timeout: Duration::from_secs(10),
        }
    }
}

/// Negotiate with every provider and return the outcomes in input order.
///
/// When `events` is given, each unit sends `negotiation_started` once it holds
/// a permit and a completed/failed event when it finishes. A unit that finds
/// the channel closed before starting skips its negotiation.
pub async fn dispatch(
    ctx: Arc<NegotiationContext>,
    providers: Arc<[Provider]>,
    settings: DispatchSettings,
    events: Option<mpsc::Sender<StreamEvent>>,
) -> Vec<NegotiationOutcome> {
    let semaphore = settings
        .max_concurrency
        .map(|max| Arc::new(Semaphore::new(max.max(1))));

    let mut join_set = JoinSet::new();
    for idx in 0..providers.len() {
        let ctx = Arc::clone(&ctx);
        let providers = Arc::clone(&providers);
        let semaphore = semaphore.clone();
        let events = events.clone();

        let unit = async move {
            let _permit = match semaphore {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            let provider = &providers[idx];

            if let Some(tx) = &events {
                let started = StreamEvent::NegotiationStarted {
                    provider: provider.clone(),
                };
                if tx.is_closed() || tx.send(started).await.is_err() {
                    return (
                        idx,
                        NegotiationOutcome::failed(provider.clone(), &NegotiationError::Cancelled),
                    );
                }
            }

            let outcome = run_unit(&ctx, provider, settings.provider_timeout).await;

            if let Some(tx) = &events {
                // The consumer may have gone away mid-flight; the outcome is
                // still returned to the aggregator.
                let _ = tx.send(StreamEvent::finished(outcome.clone())).await;
            }
            (idx, outcome)
        };
        join_set.spawn(unit.in_current_span());
    }
    drop(events);

    let mut slots: Vec<Option<NegotiationOutcome>> = vec![None; providers.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(e) => warn!(error = %e, "negotiation task did not complete"),
        }
    }

    slots
        .into_iter()
        .zip(providers.iter())
        .map(|(slot, provider)| {
            slot.unwrap_or_else(|| {
                NegotiationOutcome::failed(
                    provider.clone(),
                    &NegotiationError::Panicked("negotiation task aborted".to_string()),
                )
            })
        })
        .collect()
}

/// Run one negotiation under its deadline, converting panics to outcomes.
async fn run_unit(
    ctx: &NegotiationContext,
    provider: &Provider,
    timeout: Duration,
) -> NegotiationOutcome {
    METRICS.inc_started();
    let started = Instant::now();
    let deadline = started + timeout;
    let guarded = AssertUnwindSafe(negotiate_until(ctx, provider, deadline)).catch_unwind();

    let outcome = match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => {
            let cause = NegotiationError::Panicked(panic_message(panic.as_ref()));
            warn!(provider_id = %provider.id, error = %cause, "negotiation panicked");
            NegotiationOutcome::failed(provider.clone(), &cause)
        }
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            emit_negotiation_timed_out(&provider.id, timeout_ms);
            METRICS.inc_timed_out();
            NegotiationOutcome::failed(provider.clone(), &NegotiationError::Timeout { timeout_ms })
        }
    };

    METRICS.record_outcome(outcome.status);
    emit_negotiation_finished(
        &provider.id,
        outcome.status,
        outcome.score,
        started.elapsed().as_millis() as u64,
    );
    outcome
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{NullSynthesizer, ProviderLine, SpeechSynthesizer};
    use crate::domain::{BookingRequest, NegotiationStatus};
    use crate::fakes::{PanickingSynthesizer, Script, ScriptedLine, SlowSynthesizer};

    fn providers(n: usize) -> Arc<[Provider]> {
        (0..n)
            .map(|i| {
                Provider::new(&format!("p{i}"), &format!("Clinic {i}"), "dentist")
                    .with_rating(4.0)
                    .with_slots(["2026-02-08 14:00"])
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn context(
        line: Arc<dyn ProviderLine>,
        synth: Arc<dyn SpeechSynthesizer>,
    ) -> Arc<NegotiationContext> {
        let request = BookingRequest::new("dentist")
            .with_window("2026-02-08", "13:00", "17:00")
            .validate()
            .unwrap();
        Arc::new(NegotiationContext::new(request, vec![], line, synth))
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let line = ScriptedLine::new()
            .script("p0", Script::Answer(Duration::from_millis(30)))
            .script("p1", Script::Answer(Duration::from_millis(10)));
        let ctx = context(Arc::new(line), Arc::new(NullSynthesizer));

        let outcomes = dispatch(ctx, providers(3), DispatchSettings::default(), None).await;
        let ids: Vec<&str> = outcomes.iter().map(|o| o.provider.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2"]);
        assert!(outcomes.iter().all(|o| o.is_matched()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_alone() {
        let line = ScriptedLine::new().script("p1", Script::Answer(Duration::from_secs(60)));
        let ctx = context(Arc::new(line), Arc::new(NullSynthesizer));
        let settings = DispatchSettings {
            max_concurrency: None,
            provider_timeout: Duration::from_secs(2),
        };

        let started = Instant::now();
        let outcomes = dispatch(ctx, providers(3), settings, None).await;
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(outcomes[1].status, NegotiationStatus::Error);
        assert_eq!(
            outcomes[1].error.as_deref(),
            Some("negotiation timed out after 2000 ms")
        );
        assert!(outcomes[0].is_matched());
        assert!(outcomes[2].is_matched());
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let line = ScriptedLine::new().script("p2", Script::Panic);
        let ctx = context(Arc::new(line), Arc::new(NullSynthesizer));

        let outcomes = dispatch(ctx, providers(4), DispatchSettings::default(), None).await;
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[2].status, NegotiationStatus::Error);
        assert!(outcomes[2]
            .error
            .as_deref()
            .unwrap()
            .contains("line exploded for p2"));
        assert_eq!(outcomes.iter().filter(|o| o.is_matched()).count(), 3);
    }

    #[tokio::test]
    async fn test_panicking_synthesizer_becomes_error_outcome() {
        let ctx = context(Arc::new(ScriptedLine::new()), Arc::new(PanickingSynthesizer));
        let outcomes = dispatch(ctx, providers(2), DispatchSettings::default(), None).await;
        assert!(outcomes
            .iter()
            .all(|o| o.status == NegotiationStatus::Error));
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("speech engine crashed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_speech_keeps_match_without_audio() {
        let synth = Arc::new(SlowSynthesizer::new(Duration::from_secs(10)));
        let ctx = context(Arc::new(ScriptedLine::new()), synth);
        let settings = DispatchSettings {
            max_concurrency: None,
            provider_timeout: Duration::from_secs(10),
        };

        let outcomes = dispatch(ctx, providers(2), settings, None).await;
        for outcome in &outcomes {
            assert_eq!(outcome.status, NegotiationStatus::Matched, "{:?}", outcome.error);
            assert!(outcome.transcript.iter().all(|l| !l.has_audio()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_concurrency_serializes_units() {
        let mut line = ScriptedLine::new();
        for i in 0..4 {
            line = line.script(&format!("p{i}"), Script::Answer(Duration::from_secs(1)));
        }
        let ctx = context(Arc::new(line), Arc::new(NullSynthesizer));
        let settings = DispatchSettings {
            max_concurrency: Some(2),
            provider_timeout: Duration::from_secs(10),
        };

        let started = Instant::now();
        let outcomes = dispatch(ctx, providers(4), settings, None).await;
        let elapsed = started.elapsed();
        assert!(outcomes.iter().all(|o| o.is_matched()));
        assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_closed_channel_skips_unstarted_units() {
        let line = Arc::new(ScriptedLine::new());
        let ctx = context(line.clone(), Arc::new(NullSynthesizer));
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let outcomes = dispatch(ctx, providers(3), DispatchSettings::default(), Some(tx)).await;
        assert!(line.calls().is_empty());
        assert!(outcomes
            .iter()
            .all(|o| o.error.as_deref() == Some("negotiation cancelled before start")));
    }

    #[test]
    fn test_panic_message_extracts_payload() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
