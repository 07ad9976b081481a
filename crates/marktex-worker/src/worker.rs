//! Render worker running on its own OS thread.
//!
//! The host side holds a [`WorkerChannel`]: requests go in, [`WorkerEvent`]s
//! come out. A request that fails is answered with an `error` response and the
//! worker keeps going. Only a worker whose loop itself dies reports
//! [`WorkerEvent::Error`] and stops, the same as a crashed web worker firing
//! `onerror`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use marktex_renderer::{RenderError, Renderer};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::ChannelError;
use crate::handler::handle_request;
use crate::protocol::{WorkerRequest, WorkerResponse};

/// Something the worker sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Message(WorkerResponse),
    /// The worker failed and will not answer further requests.
    Error(String),
}

/// Host end of a worker connection.
#[derive(Debug)]
pub struct WorkerChannel {
    requests: UnboundedSender<WorkerRequest>,
    events: UnboundedReceiver<WorkerEvent>,
}

impl WorkerChannel {
    /// Wrap an existing pair of channels, e.g. a worker living somewhere other
    /// than a local thread.
    pub fn from_parts(
        requests: UnboundedSender<WorkerRequest>,
        events: UnboundedReceiver<WorkerEvent>,
    ) -> Self {
        Self { requests, events }
    }

    pub fn post(&self, request: WorkerRequest) -> Result<(), ChannelError> {
        let id = request.id.clone();
        self.requests
            .send(request)
            .map_err(|_| ChannelError::Send { id })
    }

    /// Wait for the next response.
    pub async fn recv(&mut self) -> Result<WorkerResponse, ChannelError> {
        match self.events.recv().await {
            Some(WorkerEvent::Message(response)) => Ok(response),
            Some(WorkerEvent::Error(message)) => Err(ChannelError::Worker { message }),
            None => Err(ChannelError::Disconnected),
        }
    }
}

pub struct RenderWorker;

impl RenderWorker {
    /// Start a worker thread sharing `renderer`. The thread exits once the
    /// returned channel is dropped.
    pub fn spawn(renderer: Arc<Renderer>) -> Result<WorkerChannel, ChannelError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("marktex-render-worker".into())
            .spawn(move || run(renderer, request_rx, event_tx))
            .map_err(|source| ChannelError::Spawn { source })?;

        tracing::debug!("render worker started");
        Ok(WorkerChannel::from_parts(request_tx, event_rx))
    }
}

fn run(
    renderer: Arc<Renderer>,
    mut requests: UnboundedReceiver<WorkerRequest>,
    events: UnboundedSender<WorkerEvent>,
) {
    while let Some(request) = requests.blocking_recv() {
        let event = match panic::catch_unwind(AssertUnwindSafe(|| {
            handle_request(&renderer, &request)
        })) {
            Ok(response) => WorkerEvent::Message(response),
            Err(payload) => {
                let err = RenderError::from_panic(payload);
                tracing::error!(id = %request.id, error = %err, "render worker died");
                let _ = events.send(WorkerEvent::Error(err.to_string()));
                return;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("render worker stopped");
}
