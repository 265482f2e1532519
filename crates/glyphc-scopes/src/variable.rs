//! Variables: what a scope stores, and the IDs that name them.

use glyphc_common::SourcePosition;
use glyphc_types::Type;

/// Monotonically allocated, never reused within the topmost local scope
/// that owns it; reused only across *sibling* scopes, each of which starts
/// its own counter where the parent's left off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub u32);

/// A capturing scope allocates fresh IDs for the copies it makes of an
/// enclosing analyser's variables; this is the id space those copies live
/// in, kept distinct from `VariableId` so a capture can never collide with
/// a local.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureId(pub u32);

/// Where a lookup found a name, carried back so the caller can choose
/// instance-scope-specific diagnostics and codegen paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableOrigin {
    Local,
    Instance,
    Captured,
}

/// A declared binding: its id, declared type, mutability, and the
/// bookkeeping the scope-pop checks need (was it ever mutated, is it
/// certainly initialized).
#[derive(Clone, Debug)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub declared_type: Type,
    pub declared_at: SourcePosition,
    pub mutable: bool,
    pub mutated: bool,
    pub initialized: InitializationState,
}

/// Tracked per variable so the scope-pop checks can tell a
/// definitely-initialized binding from one that's only initialized on some
/// control-flow paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitializationState {
    Uninitialized,
    Potentially,
    Certainly,
}

impl Variable {
    #[must_use]
    pub fn new(id: VariableId, name: impl Into<String>, declared_type: Type, declared_at: SourcePosition) -> Self {
        Self {
            id,
            name: name.into(),
            declared_type,
            declared_at,
            mutable: false,
            mutated: false,
            initialized: InitializationState::Uninitialized,
        }
    }

    #[must_use]
    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    #[must_use]
    pub fn initially_certain(mut self) -> Self {
        self.initialized = InitializationState::Certainly;
        self
    }

    pub fn mark_mutated(&mut self) {
        self.mutated = true;
    }

    #[must_use]
    pub fn is_certainly_initialized(&self) -> bool {
        self.initialized == InitializationState::Certainly
    }

    /// Warning condition at scope pop: declared mutable, never actually
    /// mutated.
    #[must_use]
    pub fn warrants_unused_mutable_warning(&self) -> bool {
        self.mutable && !self.mutated
    }

    /// Error condition at scope pop: a non-optional variable that is only
    /// potentially initialized.
    #[must_use]
    pub fn warrants_uninitialized_error(&self) -> bool {
        !self.declared_type.is_optional() && self.initialized == InitializationState::Potentially
    }
}
