//! Wire format shared by the in-process worker thread and `marktex worker`.
//!
//! Requests look like `{"id": "req-1", "type": "parse", "data": "# hi"}`.
//! Responses are tagged by `type`: `parse-result` carries the HTML and the LaTeX
//! validation report, `error` carries a message.

use marktex_renderer::LatexValidation;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ProtocolError;

/// The only request type a worker understands.
pub const PARSE: &str = "parse";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: SmolStr,
    /// Request type. Anything other than [`PARSE`] gets an error response.
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default)]
    pub data: String,
}

impl WorkerRequest {
    pub fn parse(id: impl Into<SmolStr>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SmolStr::new_static(PARSE),
            data: data.into(),
        }
    }

    pub fn from_json(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line).map_err(|source| ProtocolError::Decode { source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerResponse {
    #[serde(rename = "parse-result")]
    ParseResult {
        id: SmolStr,
        html: String,
        #[serde(rename = "latexValidation")]
        latex_validation: LatexValidation,
    },
    #[serde(rename = "error")]
    Error { id: SmolStr, error: String },
}

impl WorkerResponse {
    pub fn error(id: impl Into<SmolStr>, error: impl Into<String>) -> Self {
        Self::Error {
            id: id.into(),
            error: error.into(),
        }
    }

    pub fn id(&self) -> &SmolStr {
        match self {
            Self::ParseResult { id, .. } | Self::Error { id, .. } => id,
        }
    }

    /// Rendered HTML, if this is a successful parse.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::ParseResult { html, .. } => Some(html),
            Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode { source })
    }
}
