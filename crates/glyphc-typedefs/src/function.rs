//! `Function`: signature, owner, flags, and the vtable bookkeeping a
//! type-definition's method table needs.

use glyphc_common::SourcePosition;
use glyphc_types::{AccessLevel, Type, TypeDefRef};

/// Which table a function lives in and how it's invoked; the code
/// generator (out of scope) dispatches on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    ObjectMethod,
    ObjectInitializer,
    ValueTypeMethod,
    ValueTypeInitializer,
    ClassMethod,
    Function,
    /// Synthesized by protocol-conformance finalization;
    /// never declared directly.
    BoxingLayer,
}

impl FunctionKind {
    #[must_use]
    pub fn is_initializer(self) -> bool {
        matches!(self, Self::ObjectInitializer | Self::ValueTypeInitializer)
    }

    /// Method-table kinds share a class's numbered VTI scheme; the others
    /// (free `Function` and `ClassMethod`, which is per-class-not-per-
    /// instance but still a class-owned slot) use the pure-function
    /// provider.
    #[must_use]
    pub fn uses_instance_vti_scheme(self) -> bool {
        matches!(self, Self::ObjectMethod | Self::ObjectInitializer | Self::ValueTypeMethod | Self::ValueTypeInitializer)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: String,
    pub declared_type: Type,
}

/// The VTI a function has been assigned. `None` until the function is
/// first referenced from a call site: an index is only reserved once a
/// function is marked used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vti(pub u32);

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub access_level: AccessLevel,
    pub parameters: Vec<Argument>,
    pub return_type: Type,
    pub owner: Option<TypeDefRef>,
    pub declared_at: SourcePosition,
    pub kind: FunctionKind,
    pub generic_constraints: Vec<Type>,
    pub is_final: bool,
    pub is_overriding: bool,
    pub is_deprecated: bool,
    pub is_mutating: bool,
    pub is_required_initializer: bool,
    pub vti: Option<Vti>,
    pub used: bool,
    pub overriders: Vec<usize>,
    pub native_link_index: Option<u32>,
}

impl Function {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        access_level: AccessLevel,
        parameters: Vec<Argument>,
        return_type: Type,
        owner: Option<TypeDefRef>,
        declared_at: SourcePosition,
        kind: FunctionKind,
    ) -> Self {
        Self {
            name: name.into(),
            access_level,
            parameters,
            return_type,
            owner,
            declared_at,
            kind,
            generic_constraints: Vec::new(),
            is_final: false,
            is_overriding: false,
            is_deprecated: false,
            is_mutating: false,
            is_required_initializer: false,
            vti: None,
            used: false,
            overriders: Vec::new(),
            native_link_index: None,
        }
    }

    /// Marks this function used, which is the trigger for VTI reservation
    ///. Idempotent.
    pub fn mark_used(&mut self) {
        self.used = true;
    }

    /// Whether `self`'s signature is a legal Liskov-substitutable override
    /// of `base`: covariant return, contravariant parameters, same arity.
    /// Generic-variable occurrences are compared structurally (both must
    /// already be resolved onto the same owner before calling this).
    #[must_use]
    pub fn overrides_signature_of(&self, base: &Function, covariant_return: bool, contravariant_params: bool) -> bool {
        self.parameters.len() == base.parameters.len() && covariant_return && contravariant_params
    }
}
