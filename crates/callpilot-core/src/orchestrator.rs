//! Swarm orchestrator: the public entry points.
//!
//! A request is validated and the caller's calendar loaded before any provider
//! work starts. The swarm then fans out through the dispatcher and is ranked
//! once every negotiation has finished, either returned whole
//! ([`SwarmOrchestrator::negotiate`]) or surfaced as events
//! ([`SwarmOrchestrator::negotiate_stream`]).

use std::sync::Arc;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::capability::{
    CalendarSource, EmptyCalendar, NullSynthesizer, ProviderDirectory, ProviderLine,
    SimulatedLine, SpeechSynthesizer,
};
use crate::config::SwarmConfig;
use crate::dispatcher::{dispatch, DispatchSettings};
use crate::domain::{BookingRequest, Provider, StreamEvent, SwarmResult};
use crate::error::Result;
use crate::metrics::METRICS;
use crate::negotiator::NegotiationContext;
use crate::obs::{emit_calendar_unavailable, emit_swarm_finished, emit_swarm_started, swarm_span};
use crate::ranking::rank;
use crate::stream::{self, SwarmStream};

/// Runs swarms of negotiations against injected collaborators.
pub struct SwarmOrchestrator {
    config: SwarmConfig,
    line: Arc<dyn ProviderLine>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    calendar: Arc<dyn CalendarSource>,
}

impl SwarmOrchestrator {
    /// Orchestrator with a simulated line, no speech and an empty calendar.
    pub fn new(config: SwarmConfig) -> Self {
        let line = SimulatedLine::new(config.simulated_latency());
        Self {
            config,
            line: Arc::new(line),
            synthesizer: Arc::new(NullSynthesizer),
            calendar: Arc::new(EmptyCalendar),
        }
    }

    pub fn with_line(mut self, line: Arc<dyn ProviderLine>) -> Self {
        self.line = line;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSource>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    fn settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_concurrency: self.config.max_concurrency,
            provider_timeout: self.config.provider_timeout(),
        }
    }

    /// Validate the request, then load busy intervals. An unavailable
    /// calendar is logged and treated as empty.
    async fn prepare(&self, request: &BookingRequest) -> Result<NegotiationContext> {
        let validated = request.validate()?;
        let busy = match self.calendar.busy_intervals().await {
            Ok(busy) => busy,
            Err(e) => {
                emit_calendar_unavailable(&e);
                Vec::new()
            }
        };
        Ok(NegotiationContext::new(
            validated,
            busy,
            Arc::clone(&self.line),
            Arc::clone(&self.synthesizer),
        ))
    }

    /// Negotiate with every provider concurrently and return the ranked result.
    ///
    /// Only request errors are returned as `Err`; provider failures show up as
    /// `error` outcomes inside the result.
    pub async fn negotiate(
        &self,
        request: &BookingRequest,
        providers: Vec<Provider>,
    ) -> Result<SwarmResult> {
        let ctx = self.prepare(request).await?;
        let swarm_id = Uuid::new_v4();
        let span = swarm_span(swarm_id, ctx.request.service);

        let result = run_swarm(Arc::new(ctx), providers, self.settings(), None, swarm_id)
            .instrument(span)
            .await;
        Ok(result)
    }

    /// Like [`SwarmOrchestrator::negotiate`], but report progress as events.
    ///
    /// Request errors are returned before anything is spawned. The returned
    /// stream yields `negotiation_started` and `negotiation_completed` or
    /// `negotiation_failed` per provider in completion order, then a single
    /// `summary` equal to what `negotiate` would have returned.
    pub async fn negotiate_stream(
        &self,
        request: &BookingRequest,
        providers: Vec<Provider>,
    ) -> Result<SwarmStream> {
        let ctx = Arc::new(self.prepare(request).await?);
        let swarm_id = Uuid::new_v4();
        let span = swarm_span(swarm_id, ctx.request.service);
        let settings = self.settings();
        let (tx, stream) = stream::channel(self.config.event_buffer);

        let driver = async move {
            let result = run_swarm(ctx, providers, settings, Some(tx.clone()), swarm_id).await;
            if tx.send(StreamEvent::Summary { result }).await.is_err() {
                tracing::debug!("stream consumer gone before summary");
            }
        };
        tokio::spawn(driver.instrument(span));
        Ok(stream)
    }
}

async fn run_swarm(
    ctx: Arc<NegotiationContext>,
    providers: Vec<Provider>,
    settings: DispatchSettings,
    events: Option<tokio::sync::mpsc::Sender<StreamEvent>>,
    swarm_id: Uuid,
) -> SwarmResult {
    let started = Instant::now();
    emit_swarm_started(swarm_id, providers.len(), events.is_some());

    let outcomes = dispatch(ctx, providers.into(), settings, events).await;
    let result = rank(outcomes, swarm_id);

    METRICS.inc_swarms();
    emit_swarm_finished(
        swarm_id,
        result.ranked.len(),
        result.matched_count(),
        result.best.as_ref().map(|b| b.provider.id.as_str()),
        started.elapsed().as_millis() as u64,
    );
    result
}

/// Validate `request` and look up its candidate providers.
pub async fn find_providers(
    directory: &dyn ProviderDirectory,
    request: &BookingRequest,
) -> Result<Vec<Provider>> {
    let validated = request.validate()?;
    directory
        .list_providers(validated.service.as_str(), request.limit)
        .await
}
