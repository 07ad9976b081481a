//! One-at-a-time dispatch of render jobs.
//!
//! The queue is either idle or has exactly one request in flight. New requests
//! arriving while busy wait in FIFO order. When the in-flight job completes its
//! callback runs first, then the next queued request is dispatched.
//!
//! Completion never happens inside [`DispatchQueue::process`]. The owner drives
//! the queue with [`tick`](DispatchQueue::tick) or [`drain`](DispatchQueue::drain),
//! and callbacks fire from there, in fallback mode as well as worker mode.
//!
//! A failed worker channel switches the queue to fallback mode for good. The
//! request that was in flight is finished on the fallback path; nothing is
//! re-sent to the channel.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use marktex_renderer::Renderer;
use smol_str::{SmolStr, format_smolstr};

use crate::config::DispatchConfig;
use crate::error::ChannelError;
use crate::handler::handle_request;
use crate::protocol::{WorkerRequest, WorkerResponse};
use crate::worker::{RenderWorker, WorkerChannel};

pub type Callback = Box<dyn FnOnce(WorkerResponse) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Busy,
}

enum Mode {
    Worker(WorkerChannel),
    Fallback,
}

struct Pending {
    request: WorkerRequest,
    callback: Callback,
}

pub struct DispatchQueue {
    renderer: Arc<Renderer>,
    config: DispatchConfig,
    mode: Mode,
    queue: VecDeque<Pending>,
    /// Callbacks of dispatched requests, keyed by request id.
    callbacks: HashMap<SmolStr, Callback>,
    in_flight: Option<WorkerRequest>,
    next_id: u64,
}

impl DispatchQueue {
    /// Start a render worker if `config` asks for one, falling back to
    /// same-thread rendering if it can't be started.
    pub fn new(renderer: Arc<Renderer>, config: DispatchConfig) -> Self {
        let mode = if config.use_worker {
            match RenderWorker::spawn(renderer.clone()) {
                Ok(channel) => Mode::Worker(channel),
                Err(err) => {
                    tracing::warn!(error = %err, "render worker unavailable, using fallback mode");
                    Mode::Fallback
                }
            }
        } else {
            Mode::Fallback
        };
        Self::with_mode(renderer, config, mode)
    }

    /// Dispatch over an already-connected channel.
    pub fn with_channel(
        renderer: Arc<Renderer>,
        config: DispatchConfig,
        channel: WorkerChannel,
    ) -> Self {
        Self::with_mode(renderer, config, Mode::Worker(channel))
    }

    fn with_mode(renderer: Arc<Renderer>, config: DispatchConfig, mode: Mode) -> Self {
        Self {
            renderer,
            config,
            mode,
            queue: VecDeque::new(),
            callbacks: HashMap::new(),
            in_flight: None,
            next_id: 0,
        }
    }

    pub fn state(&self) -> QueueState {
        if self.in_flight.is_some() {
            QueueState::Busy
        } else {
            QueueState::Idle
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.mode, Mode::Fallback)
    }

    /// Requests waiting behind the one in flight.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Enqueue a render of `text`. `callback` runs exactly once, from a later
    /// [`tick`](Self::tick), with the response for this request.
    pub fn process<F>(&mut self, text: impl Into<String>, callback: F) -> SmolStr
    where
        F: FnOnce(WorkerResponse) + Send + 'static,
    {
        self.next_id += 1;
        let request = WorkerRequest::parse(format_smolstr!("req-{}", self.next_id), text);
        let id = request.id.clone();
        let pending = Pending {
            request,
            callback: Box::new(callback),
        };

        if self.in_flight.is_some() {
            self.queue.push_back(pending);
            tracing::debug!(%id, queued = self.queue.len(), "queue busy, request queued");
        } else {
            self.dispatch(pending);
        }
        id
    }

    /// Wait for the in-flight job to finish and run its callback. Returns
    /// `false` if the queue was idle.
    pub async fn tick(&mut self) -> bool {
        let Some(request) = self.in_flight.clone() else {
            return false;
        };

        let received = match &mut self.mode {
            Mode::Worker(channel) => Some(channel.recv().await),
            Mode::Fallback => None,
        };
        match received {
            Some(Ok(response)) => self.complete(response),
            // The in-flight request is picked up by the fallback on the next tick.
            Some(Err(err)) => self.downgrade(err),
            None => {
                self.defer().await;
                let response = handle_request(&self.renderer, &request);
                self.complete(response);
            }
        }
        true
    }

    /// Tick until idle.
    pub async fn drain(&mut self) {
        while self.tick().await {}
    }

    /// Stop the worker and drop every pending callback without calling it.
    /// The queue stays usable afterwards, in fallback mode.
    pub fn destroy(&mut self) {
        let dropped = self.callbacks.len() + self.queue.len();
        self.mode = Mode::Fallback;
        self.callbacks.clear();
        self.queue.clear();
        self.in_flight = None;
        tracing::debug!(dropped, "dispatch queue destroyed");
    }

    fn dispatch(&mut self, pending: Pending) {
        let Pending { request, callback } = pending;
        tracing::debug!(id = %request.id, fallback = self.is_fallback(), "dispatching request");
        self.callbacks.insert(request.id.clone(), callback);

        let posted = match &self.mode {
            Mode::Worker(channel) => channel.post(request.clone()),
            Mode::Fallback => Ok(()),
        };
        if let Err(err) = posted {
            self.downgrade(err);
        }
        self.in_flight = Some(request);
    }

    fn complete(&mut self, response: WorkerResponse) {
        let Some(callback) = self.callbacks.remove(response.id()) else {
            tracing::debug!(id = %response.id(), "ignoring response for unknown request");
            return;
        };
        if self
            .in_flight
            .as_ref()
            .is_some_and(|request| request.id == *response.id())
        {
            self.in_flight = None;
        }

        callback(response);

        match self.queue.pop_front() {
            Some(next) => self.dispatch(next),
            None => tracing::debug!("dispatch queue idle"),
        }
    }

    fn downgrade(&mut self, err: ChannelError) {
        if self.is_fallback() {
            return;
        }
        tracing::warn!(
            error = %err,
            queued = self.queue.len(),
            "render worker channel failed, switching to fallback mode"
        );
        self.mode = Mode::Fallback;
    }

    async fn defer(&self) {
        match self.config.fallback_delay() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("state", &self.state())
            .field("fallback", &self.is_fallback())
            .field("queued", &self.queue.len())
            .field("in_flight", &self.in_flight.as_ref().map(|r| &r.id))
            .finish_non_exhaustive()
    }
}
