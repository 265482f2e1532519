//! Orthogonal bit flags every `Type` carries, and box-identifier allocation.
//!
//! Flags are grouped by concern, with composite constants built from the
//! primitives; the four flags here are independent booleans rather than a
//! flat kind-discriminant bitset, since optional, reference, mutable, and
//! meta all apply uniformly and orthogonally to any `TypeKind`.

use bitflags::bitflags;

bitflags! {
    /// `optional`, `reference`, `mutable`, `meta` — independent of `TypeKind`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u8 {
        /// The value may be absent (`Nothingness`).
        const OPTIONAL = 1 << 0;
        /// The value is held behind an indirection rather than inline.
        const REFERENCE = 1 << 1;
        /// The binding this type describes may be mutated.
        const MUTABLE = 1 << 2;
        /// This is the reified metatype of the wrapped type, not an instance.
        const META = 1 << 3;
    }
}

impl TypeFlags {
    #[must_use]
    pub fn is_optional(self) -> bool {
        self.contains(Self::OPTIONAL)
    }

    #[must_use]
    pub fn is_reference(self) -> bool {
        self.contains(Self::REFERENCE)
    }

    #[must_use]
    pub fn is_mutable(self) -> bool {
        self.contains(Self::MUTABLE)
    }

    #[must_use]
    pub fn is_meta(self) -> bool {
        self.contains(Self::META)
    }

    #[must_use]
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.set(Self::OPTIONAL, optional);
        self
    }

    #[must_use]
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.set(Self::MUTABLE, mutable);
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: bool) -> Self {
        self.set(Self::REFERENCE, reference);
        self
    }
}

/// Dense integer naming a storage shape for a boxed value: primitive kinds
/// plus specific generic instantiations of value types (glossary: "Box
/// identifier"). Two types with identical behavior always produce the same
/// identifier because the identifier is derived structurally (see
/// `BoxIdentifierTable`), not assigned by declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxIdentifier(pub u32);

impl BoxIdentifier {
    pub const BOOLEAN: Self = Self(1);
    pub const INTEGER: Self = Self(2);
    pub const DOUBLE: Self = Self(3);
    pub const SYMBOL: Self = Self(4);

    const FIRST_DYNAMIC: u32 = 5;
}

/// Structural key used to intern box identifiers. Built from a `TypeKind`'s
/// shape (its own discriminant and def reference) plus the already-resolved
/// box identifiers of its generic arguments, so recursive structural
/// equality collapses to a flat key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoxKey {
    Primitive(&'static str),
    Class(crate::ids::ClassId, Vec<BoxIdentifier>),
    ValueType(crate::ids::ValueTypeId, Vec<BoxIdentifier>),
    Enum(crate::ids::EnumId),
    Protocol(crate::ids::ProtocolId, Vec<BoxIdentifier>),
    MultiProtocol(Vec<crate::ids::ProtocolId>),
    Callable(BoxIdentifier, Vec<BoxIdentifier>),
    GenericVariable(crate::ids::TypeDefRef, u32),
    LocalGenericVariable(crate::ids::FunctionId, u32),
    SelfType,
    Something,
    Someobject,
    Nothingness,
    Error(crate::ids::EnumId, BoxIdentifier),
}

/// Append-only interner assigning stable, order-preserving box identifiers.
/// Primitive identifiers are reserved up front (boolean=1,
/// integer=2, double=3, symbol=4); everything else is assigned densely on
/// first encounter starting at 5.
#[derive(Debug, Default)]
pub struct BoxIdentifierTable {
    interned: rustc_hash::FxHashMap<BoxKey, BoxIdentifier>,
    next: u32,
}

impl BoxIdentifierTable {
    #[must_use]
    pub fn new() -> Self {
        let mut interned = rustc_hash::FxHashMap::default();
        interned.insert(BoxKey::Primitive("boolean"), BoxIdentifier::BOOLEAN);
        interned.insert(BoxKey::Primitive("integer"), BoxIdentifier::INTEGER);
        interned.insert(BoxKey::Primitive("double"), BoxIdentifier::DOUBLE);
        interned.insert(BoxKey::Primitive("symbol"), BoxIdentifier::SYMBOL);
        Self {
            interned,
            next: BoxIdentifier::FIRST_DYNAMIC,
        }
    }

    pub fn intern(&mut self, key: BoxKey) -> BoxIdentifier {
        if let Some(id) = self.interned.get(&key) {
            return *id;
        }
        let id = BoxIdentifier(self.next);
        self.next += 1;
        self.interned.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_orthogonal() {
        let f = TypeFlags::OPTIONAL | TypeFlags::MUTABLE;
        assert!(f.is_optional());
        assert!(f.is_mutable());
        assert!(!f.is_reference());
        assert!(!f.is_meta());
    }

    #[test]
    fn identical_keys_intern_to_identical_identifier() {
        let mut table = BoxIdentifierTable::new();
        let a = table.intern(BoxKey::Something);
        let b = table.intern(BoxKey::Something);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_keys_get_distinct_identifiers() {
        let mut table = BoxIdentifierTable::new();
        let a = table.intern(BoxKey::Something);
        let b = table.intern(BoxKey::Someobject);
        assert_ne!(a, b);
    }

    #[test]
    fn primitive_identifiers_are_fixed() {
        let mut table = BoxIdentifierTable::new();
        assert_eq!(
            table.intern(BoxKey::Primitive("boolean")),
            BoxIdentifier::BOOLEAN
        );
        assert_eq!(
            table.intern(BoxKey::Primitive("integer")),
            BoxIdentifier::INTEGER
        );
    }

    #[test]
    fn dynamic_identifiers_start_after_primitives() {
        let mut table = BoxIdentifierTable::new();
        let id = table.intern(BoxKey::Something);
        assert!(id.0 >= BoxIdentifier::FIRST_DYNAMIC);
    }
}
