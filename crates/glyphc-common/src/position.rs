//! Source positions.
//!
//! The tokenizer (out of scope for this crate) stamps every
//! token with one of these. The analyzer never constructs a `SourcePosition`
//! from scratch — it always copies one forward from a token or derives one
//! from an enclosing construct so that diagnostics point at real source.

use std::fmt;

/// A single point in a source file: which file, which line, which column.
///
/// Lines and columns are 1-indexed, matching the diagnostics the original
/// Emojicode compiler prints and what a terminal-facing reporter expects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourcePosition {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder position for synthesized constructs (e.g. a boxing
    /// layer's body) that have no literal source location. Carries the
    /// position of whatever triggered the synthesis, never blank.
    #[must_use]
    pub fn synthesized_from(origin: &SourcePosition) -> Self {
        origin.clone()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
