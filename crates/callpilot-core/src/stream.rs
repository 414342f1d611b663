//! Streaming view of a swarm run.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::domain::{StreamEvent, SwarmResult};

/// Events of one swarm run in completion order, ending with a `summary`.
///
/// The stream ends when the run is over. Dropping it early cancels every
/// negotiation that has not started yet.
#[derive(Debug)]
pub struct SwarmStream {
    rx: mpsc::Receiver<StreamEvent>,
}

pub(crate) fn channel(buffer: usize) -> (mpsc::Sender<StreamEvent>, SwarmStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, SwarmStream { rx })
}

impl SwarmStream {
    /// The next event, or `None` once the run has finished.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain the stream.
    pub async fn collect_all(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    /// Drain the stream and return the final summary, if the run produced one.
    pub async fn into_result(self) -> Option<SwarmResult> {
        self.collect_all()
            .await
            .into_iter()
            .rev()
            .find_map(|event| match event {
                StreamEvent::Summary { result } => Some(result),
                _ => None,
            })
    }
}

impl Stream for SwarmStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
