//! marktex renderer
//!
//! Turns Markdown with embedded LaTeX into an HTML string without building a
//! parse tree. A render runs in three stages:
//!
//! 1. [`formula::extract`] swaps every `$$…$$` and `$…$` span for a placeholder
//!    so the Markdown rules never see TeX.
//! 2. [`markdown::transform`] applies the ordered Markdown rewrites, calling into
//!    [`table`] for pipe tables.
//! 3. [`math::inject`] puts the formulas back, rendered through whichever
//!    [`MathSupport`] the host configured.
//!
//! [`Renderer`] wires these together and never fails: on an internal error it
//! returns an error fragment instead.

pub mod config;
pub mod error;
pub mod formula;
pub mod markdown;
pub mod math;
pub mod perf;
pub mod pipeline;
pub mod sanitize;
pub mod table;
pub mod utils;
pub mod validate;

pub use config::{MathBackendKind, RenderConfig};
pub use error::RenderError;
pub use formula::{Formula, FormulaKind, FormulaSet, extract};
pub use markdown::transform;
pub use math::{MathError, MathMlRenderer, MathOptions, MathRenderer, MathSupport, inject};
pub use pipeline::Renderer;
pub use sanitize::strip_scripts;
pub use table::convert_tables;
pub use validate::{FormulaInfo, FormulaIssue, LatexValidation, validate, validate_formula};

/// Render Markdown with the default configuration.
///
/// Convenience for one-off renders; hosts that render repeatedly should build a
/// [`Renderer`] once and share it.
pub fn render(markdown: &str) -> String {
    Renderer::new(RenderConfig::default()).render(markdown)
}
