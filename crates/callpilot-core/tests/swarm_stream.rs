//! Streaming swarm runs: event accounting, ordering and cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use callpilot_core::fakes::{Script, ScriptedLine};
use callpilot_core::{
    BookingRequest, Provider, StreamEvent, SwarmConfig, SwarmOrchestrator, SwarmResult,
};
use futures::StreamExt;

fn afternoon() -> BookingRequest {
    BookingRequest::new("doctor").with_window("2026-02-08", "13:00", "17:00")
}

fn providers() -> Vec<Provider> {
    vec![
        Provider::new("a", "Alpha Clinic", "doctor")
            .with_rating(4.2)
            .with_distance(1.5)
            .with_slots(["2026-02-08 15:00"]),
        Provider::new("b", "Beta Clinic", "doctor")
            .with_rating(3.9)
            .with_slots(["2026-02-08 11:00"]),
        Provider::new("c", "Gamma Clinic", "doctor")
            .with_distance(0.4)
            .with_slots(["2026-02-08 13:15"]),
        Provider::new("d", "Delta Clinic", "doctor").with_slots(["2026-02-08 14:00"]),
    ]
}

fn scripted() -> ScriptedLine {
    ScriptedLine::new()
        .script("a", Script::Answer(Duration::from_millis(40)))
        .script("c", Script::Answer(Duration::from_millis(5)))
        .script("d", Script::Fail(Duration::from_millis(20), "line dropped".into()))
}

#[tokio::test]
async fn every_provider_starts_and_finishes_once_then_summary() {
    let orchestrator = SwarmOrchestrator::new(SwarmConfig::default()).with_line(Arc::new(scripted()));
    let events = orchestrator
        .negotiate_stream(&afternoon(), providers())
        .await
        .unwrap()
        .collect_all()
        .await;

    let started = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::NegotiationStarted { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                StreamEvent::NegotiationCompleted { .. } | StreamEvent::NegotiationFailed { .. }
            )
        })
        .count();
    assert_eq!(started, 4);
    assert_eq!(finished, 4);
    assert_eq!(events.len(), 9);
    assert_eq!(events.iter().filter(|e| e.is_summary()).count(), 1);
    assert!(events.last().unwrap().is_summary());

    let failed: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::NegotiationFailed { provider, error } => {
                assert!(error.contains("line dropped"));
                Some(provider.id.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec!["d"]);
}

#[tokio::test]
async fn started_precedes_finished_for_each_provider() {
    let orchestrator = SwarmOrchestrator::new(SwarmConfig::default()).with_line(Arc::new(scripted()));
    let events = orchestrator
        .negotiate_stream(&afternoon(), providers())
        .await
        .unwrap()
        .collect_all()
        .await;

    let mut started_at = HashMap::new();
    for (pos, event) in events.iter().enumerate() {
        match event {
            StreamEvent::NegotiationStarted { provider } => {
                started_at.insert(provider.id.clone(), pos);
            }
            StreamEvent::NegotiationCompleted { .. } | StreamEvent::NegotiationFailed { .. } => {
                let id = event.provider_id().unwrap();
                assert!(started_at[id] < pos, "{id} finished before it started");
            }
            StreamEvent::Summary { .. } => {}
        }
    }
}

#[tokio::test]
async fn summary_matches_batch_result() {
    let orchestrator = SwarmOrchestrator::new(SwarmConfig::default()).with_line(Arc::new(scripted()));

    let batch = orchestrator
        .negotiate(&afternoon(), providers())
        .await
        .unwrap();
    let summary: SwarmResult = orchestrator
        .negotiate_stream(&afternoon(), providers())
        .await
        .unwrap()
        .into_result()
        .await
        .expect("summary event");

    assert_eq!(summary, batch);
    assert_eq!(summary.best.unwrap().provider.id, "c");
}

#[tokio::test]
async fn stream_implements_futures_stream() {
    let orchestrator = SwarmOrchestrator::new(SwarmConfig::default().with_max_concurrency(2));
    let stream = orchestrator
        .negotiate_stream(&afternoon(), providers())
        .await
        .unwrap();

    let kinds: Vec<bool> = stream.map(|e| e.is_summary()).collect().await;
    assert_eq!(kinds.len(), 9);
    assert_eq!(kinds.iter().filter(|s| **s).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_stream_skips_unstarted_negotiations() {
    let line = Arc::new(
        ScriptedLine::new()
            .script("a", Script::Answer(Duration::from_secs(1)))
            .script("b", Script::Answer(Duration::from_secs(1)))
            .script("c", Script::Answer(Duration::from_secs(1)))
            .script("d", Script::Answer(Duration::from_secs(1))),
    );
    let config = SwarmConfig::default().with_max_concurrency(1);
    let orchestrator = SwarmOrchestrator::new(config).with_line(line.clone());

    let mut stream = orchestrator
        .negotiate_stream(&afternoon(), providers())
        .await
        .unwrap();
    let first = stream.next_event().await.unwrap();
    assert!(matches!(first, StreamEvent::NegotiationStarted { .. }));
    drop(stream);

    // Let the in-flight negotiation and the driver run to completion.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(line.calls().len(), 1);
}
