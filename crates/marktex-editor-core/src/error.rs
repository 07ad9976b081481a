use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum VirtualScrollError {
    #[error("item height must be a positive number of pixels, got {height}")]
    #[diagnostic(code(marktex::scroll::item_height))]
    InvalidItemHeight { height: f64 },
}
