use miette::Diagnostic;
use thiserror::Error;

/// Pipeline-level render failure.
///
/// Never escapes [`Renderer::render`](crate::Renderer::render); it is turned into
/// an error fragment there.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("render panicked: {message}")]
    #[diagnostic(code(marktex::render::panicked))]
    Panicked { message: String },
}

impl RenderError {
    /// Build from a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked { message }
    }
}
