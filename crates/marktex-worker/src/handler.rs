use std::panic::{self, AssertUnwindSafe};

use marktex_renderer::{RenderError, Renderer};

use crate::protocol::{PARSE, WorkerRequest, WorkerResponse};

/// Answer one request. Runs the same way on the worker thread, on the
/// fallback path and in the stdio worker.
///
/// A panic while parsing is answered with an `error` response for that
/// request; the caller keeps serving.
pub fn handle_request(renderer: &Renderer, request: &WorkerRequest) -> WorkerResponse {
    match request.kind.as_str() {
        PARSE => {
            tracing::debug!(id = %request.id, len = request.data.len(), "handling parse request");
            panic::catch_unwind(AssertUnwindSafe(|| parse(renderer, request))).unwrap_or_else(
                |payload| {
                    let err = RenderError::from_panic(payload);
                    tracing::error!(id = %request.id, error = %err, "parse request failed");
                    WorkerResponse::error(request.id.clone(), err.to_string())
                },
            )
        }
        other => {
            tracing::warn!(id = %request.id, kind = other, "unknown worker request type");
            WorkerResponse::error(request.id.clone(), format!("Unknown command: {other}"))
        }
    }
}

fn parse(renderer: &Renderer, request: &WorkerRequest) -> WorkerResponse {
    let html = renderer.render(&request.data);
    let latex_validation = renderer.validate(&request.data);
    WorkerResponse::ParseResult {
        id: request.id.clone(),
        html,
        latex_validation,
    }
}
