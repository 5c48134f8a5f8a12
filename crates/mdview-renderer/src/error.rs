//! Render error types.

use crate::highlight::HighlightError;

/// Error that fails a whole render call.
///
/// Untrusted document content never produces one of these: unsafe links,
/// images and markup are neutralized instead.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The shared highlighting engine could not be built.
    #[error("syntax highlighter unavailable: {0}")]
    Highlighter(#[from] HighlightError),

    /// The parser closed an element that was never opened.
    #[error("unbalanced document tree: unexpected end of <{0}>")]
    UnbalancedTree(String),
}
