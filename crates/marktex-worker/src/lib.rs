//! Off-thread rendering for marktex.
//!
//! [`DispatchQueue`] hands render jobs to a [`RenderWorker`] thread one at a
//! time and delivers each result to its callback in submission order. If the
//! worker can't be used the queue renders on the calling task instead, with the
//! same [`Renderer`](marktex_renderer::Renderer) and the same
//! [`handle_request`] code.

pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod queue;
pub mod worker;

pub use config::DispatchConfig;
pub use error::{ChannelError, ProtocolError};
pub use handler::handle_request;
pub use protocol::{WorkerRequest, WorkerResponse};
pub use queue::{Callback, DispatchQueue, QueueState};
pub use worker::{RenderWorker, WorkerChannel, WorkerEvent};
