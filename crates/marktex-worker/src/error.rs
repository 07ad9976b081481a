use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Failure of the channel between the dispatch queue and its worker.
///
/// Any of these permanently switches a [`DispatchQueue`](crate::DispatchQueue)
/// to fallback mode.
#[derive(Debug, Error, Diagnostic)]
pub enum ChannelError {
    #[error("failed to start render worker")]
    #[diagnostic(code(marktex::worker::spawn))]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to post request {id} to render worker")]
    #[diagnostic(code(marktex::worker::send))]
    Send { id: SmolStr },

    #[error("render worker disconnected")]
    #[diagnostic(code(marktex::worker::disconnected))]
    Disconnected,

    #[error("render worker failed: {message}")]
    #[diagnostic(code(marktex::worker::failed))]
    Worker { message: String },
}

/// Malformed JSON on the worker wire.
#[derive(Debug, Error, Diagnostic)]
pub enum ProtocolError {
    #[error("invalid worker request")]
    #[diagnostic(
        code(marktex::worker::decode),
        help("requests look like {{\"id\": \"1\", \"type\": \"parse\", \"data\": \"…\"}}")
    )]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode worker response")]
    #[diagnostic(code(marktex::worker::encode))]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}
