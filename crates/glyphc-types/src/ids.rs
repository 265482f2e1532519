//! Opaque arena identifiers for type definitions and functions.
//!
//! `glyphc-types` only needs these to name what a `Type::Class`,
//! `Type::Protocol`, `Type::GenericVariable`, etc. refers to; the actual
//! `TypeDefinition` storage (name, methods, generic constraints, instance
//! scope) is assembled one layer up in `glyphc-typedefs`, which depends on
//! `glyphc-scopes` for the instance scope and so cannot sit below `Type`.

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueTypeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

/// A `GenericVariable`'s owner: any type definition kind that carries its
/// own generic parameters. Enums are never generic, so they're absent here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDefRef {
    Class(ClassId),
    ValueType(ValueTypeId),
    Protocol(ProtocolId),
}
