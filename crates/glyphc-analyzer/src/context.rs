//! `AnalyzerContext`: the shared, mutably-borrowed state threaded through
//! one function body's analysis — separates state from the dispatch logic
//! in `dispatch.rs`/`control_flow.rs`/`calls.rs`, which borrow it rather
//! than own it.

use glyphc_common::{CompilerError, SourcePosition};
use glyphc_scopes::{Incident, PathAnalyser, ScopeStack};
use glyphc_typedefs::parser::TypeDynamism;
use glyphc_typedefs::{Function, FunctionKind};
use glyphc_types::{FunctionId, Type, TypeContext};

use crate::reporter::Reporter;
use crate::writer::{StringPool, Writer};

/// Status flags that accumulate over a function body's analysis rather
/// than belonging to any one expression.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalyzerStatus {
    /// Whether the current branch has produced any instruction with an
    /// observable effect (used to detect a body that's entirely dead).
    pub effect: bool,
    pub returned: bool,
    pub used_self: bool,
    pub called_super: bool,
    /// Nesting depth of loops/conditionals, incremented by
    /// `control_flow.rs` on entry and decremented on exit; used to decide
    /// whether a `break`/`continue` is legal.
    pub flow_control_depth: u32,
}

/// Everything one function body's analysis needs in hand: the function
/// being compiled, the instruction stream it's writing, its lexical scopes
/// and path-sensitive facts, the substitution context for resolving its
/// own generic variables and `Self`, and the accumulated status flags.
pub struct AnalyzerContext<'a> {
    pub function: &'a Function,
    pub writer: Writer,
    pub scopes: ScopeStack,
    pub path: PathAnalyser,
    pub type_context: TypeContext,
    pub status: AnalyzerStatus,
    /// Which symbolic type-name forms (`Self`, generic variables) are
    /// currently legal to parse. Set from `AnalyzerOptions::top_level_dynamism`
    /// when the context is created; narrowed by callers that descend into a
    /// context where fewer forms apply (e.g. an explicit generic-argument
    /// list at a call site, which never sees `Self`).
    pub dynamism: TypeDynamism,
    /// Whether this initializer's owner has a non-final superclass, so a
    /// super call is certainly required before `self` may be used. `false`
    /// for every non-initializer and for an initializer with no superclass.
    pub requires_super_call: bool,
    pub reporter: &'a mut Reporter,
    /// Shared with every other function in the same package, not reset
    /// per function (`get-string-pool` instruction indexes a
    /// package-wide pool).
    pub string_pool: &'a mut StringPool,
}

impl<'a> AnalyzerContext<'a> {
    #[must_use]
    pub fn new(function: &'a Function, type_context: TypeContext, reporter: &'a mut Reporter, string_pool: &'a mut StringPool) -> Self {
        Self {
            function,
            writer: Writer::new(),
            scopes: ScopeStack::new(),
            path: PathAnalyser::new(),
            type_context,
            status: AnalyzerStatus::default(),
            dynamism: TypeDynamism::empty(),
            requires_super_call: false,
            reporter,
            string_pool,
        }
    }

    #[must_use]
    pub fn function_id(&self) -> Option<FunctionId> {
        self.type_context.function
    }

    #[must_use]
    pub fn is_initializer(&self) -> bool {
        matches!(
            self.function.kind,
            FunctionKind::ObjectInitializer | FunctionKind::ValueTypeInitializer
        )
    }

    /// Resolves `ty` against this function body's own `TypeContext`.
    #[must_use]
    pub fn resolve(&self, ty: &Type) -> Type {
        glyphc_types::substitution::resolve_on(ty, &self.type_context, true)
    }

    /// Records a use of `self` (here, an implicit instance-variable
    /// reference). In an initializer that requires a super call, this is an
    /// error unless the super initializer has certainly already run.
    pub fn mark_self_used(&mut self, position: &SourcePosition) -> Result<(), CompilerError> {
        if self.requires_super_call && self.is_initializer() && !self.path.has_certainly(Incident::SuperInitializerCalled) {
            return Err(CompilerError::MissingSuperInitializerCall { position: position.clone() });
        }
        self.status.used_self = true;
        self.path.record_incident(Incident::SelfUsed);
        Ok(())
    }

    pub fn mark_super_called(&mut self) {
        self.status.called_super = true;
        self.path.record_incident(Incident::SuperInitializerCalled);
    }

    pub fn mark_returned(&mut self) {
        self.status.returned = true;
        self.path.record_incident(Incident::Returned);
    }
}
