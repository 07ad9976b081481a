//! Formula rendering and re-injection.
//!
//! The math backend is an injected capability: a [`MathSupport`] is decided when
//! the [`Renderer`](crate::Renderer) is built, and "no backend" is a variant of
//! it rather than something probed for at render time.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig as MathConfig, mathml::push_mathml,
};
use thiserror::Error;

use crate::formula::{Formula, FormulaSet};
use crate::utils::escape;

/// Options passed to a math backend for one formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MathOptions {
    /// Return `Err` on malformed input instead of inline error markup.
    pub throw_on_error: bool,
    /// Block (display) rather than inline presentation.
    pub display_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum MathError {
    #[error("{message}")]
    #[diagnostic(code(marktex::math::parse))]
    Parse { message: String },

    #[error("failed to emit MathML: {message}")]
    #[diagnostic(code(marktex::math::emit))]
    Emit { message: String },
}

/// Something that can turn TeX (without delimiters) into HTML.
pub trait MathRenderer: Send + Sync {
    fn render_to_string(&self, formula: &str, options: MathOptions) -> Result<String, MathError>;
}

impl<F> MathRenderer for F
where
    F: Fn(&str, MathOptions) -> Result<String, MathError> + Send + Sync,
{
    fn render_to_string(&self, formula: &str, options: MathOptions) -> Result<String, MathError> {
        self(formula, options)
    }
}

/// LaTeX → MathML via pulldown-latex.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathMlRenderer;

impl MathRenderer for MathMlRenderer {
    fn render_to_string(&self, latex: &str, options: MathOptions) -> Result<String, MathError> {
        let storage = Storage::new();
        let parser = Parser::new(latex, &storage);
        let config = MathConfig {
            display_mode: if options.display_mode {
                DisplayMode::Block
            } else {
                DisplayMode::Inline
            },
            ..Default::default()
        };

        // Collect first so parse errors can be reported before emitting anything.
        let events: Vec<_> = parser.collect();
        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
            .collect();

        if !errors.is_empty() {
            let message = errors.join("; ");
            if options.throw_on_error {
                return Err(MathError::Parse { message });
            }
            return Ok(format_error_html(latex, &message, options.display_mode));
        }

        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), config).map_err(|e| MathError::Emit {
            message: e.to_string(),
        })?;
        Ok(mathml)
    }
}

fn format_error_html(latex: &str, error: &str, display_mode: bool) -> String {
    let mode_class = if display_mode {
        "math-display"
    } else {
        "math-inline"
    };
    format!(
        r#"<span class="math math-error {mode_class}" title="{}"><code>{}</code></span>"#,
        escape(error),
        escape(latex)
    )
}

/// Math rendering capability available to a render.
#[derive(Clone, Default)]
pub enum MathSupport {
    Renderer(Arc<dyn MathRenderer>),
    /// No backend: formulas are emitted as tagged plain text for a later pass.
    #[default]
    Unavailable,
}

impl MathSupport {
    pub fn available(renderer: impl MathRenderer + 'static) -> Self {
        Self::Renderer(Arc::new(renderer))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Renderer(_))
    }
}

impl fmt::Debug for MathSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renderer(_) => f.write_str("MathSupport::Renderer(..)"),
            Self::Unavailable => f.write_str("MathSupport::Unavailable"),
        }
    }
}

/// Replace every placeholder in `html` with its rendered formula, in discovery
/// order. Never fails: a formula the backend rejects becomes an inline error
/// marker carrying its source and the message.
pub fn inject(html: &str, formulas: &FormulaSet, math: &MathSupport) -> String {
    if formulas.is_empty() {
        return html.to_string();
    }
    if !math.is_available() {
        tracing::warn!(
            count = formulas.len(),
            "math renderer unavailable, emitting formulas unrendered"
        );
    }

    let mut out = html.to_string();
    for formula in formulas {
        let replacement = match math {
            MathSupport::Renderer(renderer) => render_formula(renderer.as_ref(), formula),
            MathSupport::Unavailable => unrendered(formula),
        };
        out = out.replacen(formula.placeholder.as_str(), &replacement, 1);
    }
    out
}

fn render_formula(renderer: &dyn MathRenderer, formula: &Formula) -> String {
    let options = MathOptions {
        throw_on_error: false,
        display_mode: formula.kind.is_display(),
    };
    match renderer.render_to_string(formula.body(), options) {
        Ok(markup) => markup,
        Err(err) => {
            tracing::error!(formula = %formula.raw, error = %err, "formula rendering failed");
            error_marker(formula, &err.to_string())
        }
    }
}

fn error_marker(formula: &Formula, message: &str) -> String {
    let tag = if formula.kind.is_display() { "div" } else { "span" };
    format!(
        r#"<{tag} class="latex-error" title="{}">{}</{tag}>"#,
        escape(message),
        escape(&formula.raw)
    )
}

fn unrendered(formula: &Formula) -> String {
    if formula.kind.is_display() {
        format!(
            r#"<div class="math math-display">{}</div>"#,
            escape(formula.body())
        )
    } else {
        format!(
            r#"<span class="math math-inline">{}</span>"#,
            escape(formula.body())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::extract;

    fn mathml(latex: &str, display_mode: bool) -> Result<String, MathError> {
        MathMlRenderer.render_to_string(
            latex,
            MathOptions {
                throw_on_error: true,
                display_mode,
            },
        )
    }

    #[test]
    fn renders_inline_math() {
        let out = mathml("x^2", false).unwrap();
        assert!(out.contains("<math"));
        assert!(out.contains("</math>"));
    }

    #[test]
    fn renders_display_math() {
        let out = mathml(r"\frac{a}{b}", true).unwrap();
        assert!(out.contains("<mfrac"));
    }

    #[test]
    fn invalid_latex_errors_when_throwing() {
        assert!(matches!(mathml(r"\frac{a", false), Err(MathError::Parse { .. })));
    }

    #[test]
    fn invalid_latex_is_marked_up_when_not_throwing() {
        let out = MathMlRenderer
            .render_to_string(r"\frac{a", MathOptions::default())
            .unwrap();
        assert!(out.contains("math-error"));
        assert!(out.contains(r"\frac{a"));
    }

    #[test]
    fn identity_backend_reproduces_block_spans() {
        let source = "a\n$$\n\\sum_i x_i\n$$\nb $$y$$";
        let (protected, formulas) = extract(source);
        let echo = MathSupport::available(|tex: &str, opts: MathOptions| {
            let delim = if opts.display_mode { "$$" } else { "$" };
            Ok::<_, MathError>(format!("{delim}{tex}{delim}"))
        });
        assert_eq!(inject(&protected, &formulas, &echo), source);
    }

    #[test]
    fn backend_failure_becomes_marker_with_raw_source() {
        let (protected, formulas) = extract("<p>before $\\oops$ after</p>");
        let failing = MathSupport::available(|_: &str, _: MathOptions| {
            Err::<String, _>(MathError::Parse {
                message: "undefined control sequence".into(),
            })
        });
        let html = inject(&protected, &formulas, &failing);
        assert_eq!(
            html,
            "<p>before <span class=\"latex-error\" title=\"undefined control sequence\">$\\oops$</span> after</p>"
        );
    }

    #[test]
    fn unavailable_backend_emits_tagged_text() {
        let (protected, formulas) = extract("$a<b$ and $$c$$");
        let html = inject(&protected, &formulas, &MathSupport::Unavailable);
        assert_eq!(
            html,
            "<span class=\"math math-inline\">a&lt;b</span> and <div class=\"math math-display\">c</div>"
        );
    }
}
