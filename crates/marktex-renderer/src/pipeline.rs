use std::panic::{self, AssertUnwindSafe};

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::formula::extract;
use crate::markdown::transform;
use crate::math::{MathSupport, inject};
use crate::perf::StageTimer;
use crate::sanitize::strip_scripts;
use crate::utils::{escape, preview};
use crate::validate::{LatexValidation, validate};

/// The end-to-end Markdown + LaTeX renderer.
///
/// Holds no per-render state, so one instance can be shared (behind an `Arc`)
/// by a worker thread and the fallback path alike.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
    math: MathSupport,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let math = config.math_support();
        Self { config, math }
    }

    /// Use `math` instead of the backend named in `config`.
    pub fn with_math(config: RenderConfig, math: MathSupport) -> Self {
        Self { config, math }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn math(&self) -> &MathSupport {
        &self.math
    }

    /// Render to HTML. Never fails; an internal error yields an error fragment
    /// carrying the message.
    pub fn render(&self, markdown: &str) -> String {
        match self.try_render(markdown) {
            Ok(html) => html,
            Err(err) => {
                tracing::error!(error = %err, "markdown rendering failed");
                error_fragment(&err)
            }
        }
    }

    /// Like [`render`](Self::render) but hands back the failure.
    pub fn try_render(&self, markdown: &str) -> Result<String, RenderError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let _timer = StageTimer::start("render", markdown.len());
            self.render_unchecked(markdown)
        }))
        .map_err(RenderError::from_panic)
    }

    pub fn validate(&self, markdown: &str) -> LatexValidation {
        let _timer = StageTimer::start("validate", markdown.len());
        validate(markdown, &self.math)
    }

    fn render_unchecked(&self, markdown: &str) -> String {
        tracing::debug!(len = markdown.len(), "rendering markdown");

        let (protected, formulas) = extract(markdown);
        let html = transform(&protected);
        let html = inject(&html, &formulas, &self.math);
        let html = if self.config.strip_scripts {
            strip_scripts(&html).into_owned()
        } else {
            html
        };

        tracing::debug!(len = html.len(), preview = preview(&html, 200), "rendered html");
        html
    }
}

/// The fragment returned in place of a document that failed to render.
pub fn error_fragment(err: &RenderError) -> String {
    format!(
        r#"<div class="error">Error rendering markdown: {}</div>"#,
        escape(&err.to_string())
    )
}
