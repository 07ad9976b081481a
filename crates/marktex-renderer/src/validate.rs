//! LaTeX validation, used for error highlighting in the editor.

use serde::{Deserialize, Serialize};

use crate::formula::{FormulaKind, extract};
use crate::math::{MathOptions, MathSupport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaInfo {
    /// TeX without delimiters.
    pub formula: String,
    #[serde(rename = "type")]
    pub kind: FormulaKind,
    /// Byte offset of the opening delimiter in the source.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaIssue {
    pub formula: String,
    #[serde(rename = "type")]
    pub kind: FormulaKind,
    pub position: usize,
    pub error: String,
}

/// Every formula in a document plus the ones that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatexValidation {
    pub formulas: Vec<FormulaInfo>,
    pub errors: Vec<FormulaIssue>,
}

impl LatexValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// List and check every formula in `text`, in source order.
pub fn validate(text: &str, math: &MathSupport) -> LatexValidation {
    let (_, set) = extract(text);
    let mut found: Vec<_> = set.iter().collect();
    found.sort_by_key(|f| f.position);

    let mut validation = LatexValidation::default();
    for formula in found {
        let body = formula.body().to_string();
        if let Err(error) = check_formula(&body, formula.kind.is_display(), math) {
            validation.errors.push(FormulaIssue {
                formula: body.clone(),
                kind: formula.kind,
                position: formula.position,
                error,
            });
        }
        validation.formulas.push(FormulaInfo {
            formula: body,
            kind: formula.kind,
            position: formula.position,
        });
    }

    tracing::debug!(
        formulas = validation.formulas.len(),
        errors = validation.errors.len(),
        "validated latex"
    );
    validation
}

/// Check a single formula (without delimiters).
pub fn validate_formula(formula: &str, math: &MathSupport) -> Result<(), String> {
    check_formula(formula, false, math)
}

fn check_formula(formula: &str, display_mode: bool, math: &MathSupport) -> Result<(), String> {
    check_braces(formula)?;
    if let MathSupport::Renderer(renderer) = math {
        let options = MathOptions {
            throw_on_error: true,
            display_mode,
        };
        renderer
            .render_to_string(formula, options)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Unescaped `{` and `}` must pair up in count.
fn check_braces(formula: &str) -> Result<(), String> {
    let mut open = 0usize;
    let mut close = 0usize;
    let mut chars = formula.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => open += 1,
            '}' => close += 1,
            _ => {}
        }
    }
    if open == close {
        Ok(())
    } else {
        Err(format!("Unbalanced braces: {open} opening vs {close} closing"))
    }
}
