//! `TypeKind`: the tagged variant at the center of the type system.

use crate::ids::{ClassId, EnumId, FunctionId, ProtocolId, TypeDefRef, ValueTypeId};
use crate::ty::Type;

/// The kind-specific payload of a `Type`. Dispatch on this, never on a flat
/// discriminant bitset, so the flags carried alongside it in `Type` stay
/// orthogonal to which kind a given type is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A class instance type. `generic_arguments` includes the
    /// superclass's arguments prepended before the class's own.
    Class(ClassId, Vec<Type>),
    /// An unboxed or boxed value type. Primitives (boolean, integer,
    /// double, symbol) are value types of size 1, flagged primitive by
    /// their `ValueTypeId` in the owning arena, not by a separate bit here.
    ValueType(ValueTypeId, Vec<Type>),
    /// An enumeration; always size 1, never generic.
    Enum(EnumId),
    /// A single protocol; always stored boxed.
    Protocol(ProtocolId, Vec<Type>),
    /// An unordered set of protocols, canonicalized by sorting on
    /// `ProtocolId` so that set-equal `MultiProtocol`s compare and hash
    /// identically regardless of the order they were adopted in.
    MultiProtocol(Vec<Type>),
    /// A first-class callable: closure or captured method.
    Callable {
        return_type: Box<Type>,
        argument_types: Vec<Type>,
    },
    /// A reference to a type-definition's own generic parameter, resolved
    /// against the owner in the active `TypeContext`.
    GenericVariable { index: u32, owner: TypeDefRef },
    /// A reference to a function's own generic parameter, resolved against
    /// the function in the active `TypeContext`.
    LocalGenericVariable { index: u32, function: FunctionId },
    /// "The callee's own type"; resolves to the type context's callee type
    /// when substitution is asked to resolve self.
    SelfType,
    /// Top type for all values.
    Something,
    /// Top type for all references (classes, protocols).
    Someobject,
    /// Absence of a value (not the same as an optional's "no value").
    Nothingness,
    /// A fallible result: either a value of the wrapped type or a member of
    /// `error_enum`.
    Error {
        error_enum: EnumId,
        wrapped: Box<Type>,
    },
}

impl TypeKind {
    /// Whether this kind is "abstract over instances": a value of this kind
    /// may be backed by any of several concrete representations, so it can
    /// never be stored unboxed.
    #[must_use]
    pub fn is_abstract_over_instances(&self) -> bool {
        matches!(
            self,
            Self::Protocol(..)
            | Self::MultiProtocol(_)
            | Self::GenericVariable { .. }
            | Self::LocalGenericVariable { .. }
            | Self::Something
            | Self::Someobject
        )
    }

    /// Canonicalize a `MultiProtocol`'s constituents by `ProtocolId`. No-op
    /// for every other kind.
    pub fn canonicalize(&mut self) {
        if let Self::MultiProtocol(members) = self {
            members.sort_by_key(|t| match &t.kind {
                Self::Protocol(id, _) => id.0,
                _ => u32::MAX,
            });
            members.dedup();
        }
    }
}
