//! `Type`: a `TypeKind` plus the orthogonal flags and box identifier that
//! travel with it everywhere.

use crate::flags::{BoxIdentifier, TypeFlags};
use crate::ids::{FunctionId, TypeDefRef};
use crate::kind::TypeKind;

/// A fully formed type as it flows through analysis: what it is (`kind`),
/// how it's qualified (`flags`), and how it's identified for boxing
/// purposes (`box_identifier`, filled in once the type is interned into a
/// `BoxIdentifierTable`; `None` for a type that hasn't been classified yet).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub kind: TypeKind,
    pub flags: TypeFlags,
    pub box_identifier: Option<BoxIdentifier>,
}

impl Type {
    #[must_use]
    pub fn new(kind: TypeKind, flags: TypeFlags) -> Self {
        Self {
            kind,
            flags,
            box_identifier: None,
        }
    }

    #[must_use]
    pub fn something() -> Self {
        Self::new(TypeKind::Something, TypeFlags::empty())
    }

    #[must_use]
    pub fn someobject() -> Self {
        Self::new(TypeKind::Someobject, TypeFlags::empty())
    }

    #[must_use]
    pub fn nothingness() -> Self {
        Self::new(TypeKind::Nothingness, TypeFlags::empty())
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.flags = self.flags.with_optional(true);
        self
    }

    #[must_use]
    pub fn mutable(mut self) -> Self {
        self.flags = self.flags.with_mutable(true);
        self
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.flags.is_optional() || matches!(self.kind, TypeKind::Nothingness)
    }

    /// Strip the optional flag, yielding the type of a present value. Only
    /// meaningful when `is_optional` is true; callers unwrap an already
    /// narrowed optional and should never call this unconditionally.
    #[must_use]
    pub fn unwrapped(&self) -> Self {
        let mut unwrapped = self.clone();
        unwrapped.flags = unwrapped.flags.with_optional(false);
        unwrapped
    }

    #[must_use]
    pub fn is_error_type(&self) -> bool {
        matches!(self.kind, TypeKind::Error { .. })
    }

    /// Unwraps an `Error` type to its success payload; identity for every
    /// other kind. Used by call-site analysis after a propagating `try`.
    #[must_use]
    pub fn success_type(&self) -> Self {
        match &self.kind {
            TypeKind::Error { wrapped,.. } => (**wrapped).clone(),
            _ => self.clone(),
        }
    }
}

/// The substitution environment `resolve_on` walks against: the generic
/// arguments bound to a type definition's own parameters, the generic
/// arguments bound to the enclosing function's own parameters, and what
/// `SelfType` currently resolves to. Bundles "what's in scope for resolving
/// this expression" into one value threaded through recursive calls.
#[derive(Clone, Debug, Default)]
pub struct TypeContext {
    pub owner: Option<TypeDefRef>,
    pub owner_arguments: Vec<Type>,
    pub function: Option<FunctionId>,
    pub function_arguments: Vec<Type>,
    pub calling_type: Option<Box<Type>>,
}

impl TypeContext {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_owner(owner: TypeDefRef, owner_arguments: Vec<Type>) -> Self {
        Self {
            owner: Some(owner),
            owner_arguments,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_function(mut self, function: FunctionId, function_arguments: Vec<Type>) -> Self {
        self.function = Some(function);
        self.function_arguments = function_arguments;
        self
    }

    #[must_use]
    pub fn with_calling_type(mut self, calling_type: Type) -> Self {
        self.calling_type = Some(Box::new(calling_type));
        self
    }
}
