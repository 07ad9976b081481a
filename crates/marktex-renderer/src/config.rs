use serde::{Deserialize, Serialize};

use crate::math::{MathMlRenderer, MathSupport};

/// Which math backend a [`Renderer`](crate::Renderer) is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathBackendKind {
    /// LaTeX → MathML via pulldown-latex.
    #[default]
    Mathml,
    /// No math backend. Formulas are emitted as tagged plain text so a later
    /// client-side pass can pick them up.
    None,
}

/// Render configuration.
///
/// Built once by the host and handed to [`Renderer::new`](crate::Renderer::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub math: MathBackendKind,
    /// Strip `<script>` elements from the final HTML.
    pub strip_scripts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            math: MathBackendKind::Mathml,
            strip_scripts: true,
        }
    }
}

impl RenderConfig {
    /// Build the math capability this configuration asks for.
    pub fn math_support(&self) -> MathSupport {
        match self.math {
            MathBackendKind::Mathml => MathSupport::available(MathMlRenderer),
            MathBackendKind::None => MathSupport::Unavailable,
        }
    }
}
