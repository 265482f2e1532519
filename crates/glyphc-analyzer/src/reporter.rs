//! Error and warning formatter: the path by which user-facing
//! diagnostics leave the compiler, distinct from `tracing`'s internal
//! telemetry. Errors set a sticky "had error" flag but never stop the
//! reporter from accepting further diagnostics.

use glyphc_common::{CompilerError, Diagnostic, DiagnosticCategory, SourcePosition};

#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
}

impl Reporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, position: SourcePosition, message: impl Into<String>) {
        self.had_error = true;
        self.diagnostics.push(Diagnostic::error(position, message));
    }

    pub fn warning(&mut self, position: SourcePosition, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(position, message));
    }

    /// Records a `CompilerError` as an error diagnostic. This is the
    /// recovery boundary's standard move: the error is reported, then
    /// discarded, so compilation of the next declaration can proceed.
    pub fn report(&mut self, error: CompilerError) {
        self.error(error.position().clone(), error.to_string());
    }

    #[must_use]
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.category == DiagnosticCategory::Error)
    }

    #[must_use]
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.category == DiagnosticCategory::Warning)
    }
}
