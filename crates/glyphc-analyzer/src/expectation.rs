//! `TypeExpectation`: threaded into every sub-expression parse to drive
//! literal-form inference and the boxing bridge.

use glyphc_types::{FunctionId, Type};

/// One unbound generic parameter's worth of inference state, collected
/// across every argument expression parsed against it before being
/// finalized by `CommonTypeFinder` once every call argument has been seen.
#[derive(Clone, Debug, Default)]
pub struct InferenceFinder {
    pub function: Option<FunctionId>,
    pub parameter_index: u32,
    pub candidates: Vec<Type>,
}

impl InferenceFinder {
    #[must_use]
    pub fn new(function: FunctionId, parameter_index: u32) -> Self {
        Self {
            function: Some(function),
            parameter_index,
            candidates: Vec::new(),
        }
    }

    pub fn record(&mut self, candidate: Type) {
        self.candidates.push(candidate);
    }
}

/// What a sub-expression parse is expected to produce: the desired type (if
/// any), whether the caller wants a reference rather than a value, whether a
/// temporary is an acceptable result, and the set of generic-inference
/// finders active for the enclosing call (if any).
#[derive(Clone, Debug, Default)]
pub struct TypeExpectation {
    pub desired: Option<Type>,
    pub wants_reference: bool,
    pub allow_temporary: bool,
    pub inference_finders: Vec<InferenceFinder>,
}

impl TypeExpectation {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of(desired: Type) -> Self {
        Self {
            desired: Some(desired),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn reference(mut self) -> Self {
        self.wants_reference = true;
        self
    }

    #[must_use]
    pub fn allowing_temporary(mut self) -> Self {
        self.allow_temporary = true;
        self
    }

    #[must_use]
    pub fn has_expectation(&self) -> bool {
        self.desired.is_some()
    }
}
