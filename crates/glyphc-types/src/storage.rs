//! Storage classification: deciding whether a `Type` is passed inline
//! (`Simple`), inline-with-a-sentinel (`SimpleOptional`), or behind an
//! allocation (`Box`).

use crate::kind::TypeKind;
use crate::ty::Type;

/// Machine words a `SimpleOptional` may occupy before it must be boxed.
/// Four words covers a pointer-sized payload plus a tag and then some,
/// enough for an inline enum discriminant plus payload.
pub const MAX_SIMPLE_OPTIONAL_WORDS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageType {
    /// Passed and stored inline, no tag.
    Simple,
    /// Passed and stored inline with a present/absent discriminant.
    SimpleOptional,
    /// Passed and stored as a pointer to heap-allocated, reference-counted
    /// storage.
    Box,
}

/// A type's size in machine words when stored `Simple`, before optional
/// wrapping is considered. `glyphc-typedefs` supplies real sizes for value
/// types and classes (classes are always 1 word, a pointer); this trait
/// keeps `glyphc-types` from needing to know the arena.
pub trait SizeOf {
    fn size_in_words(&self, ty: &Type) -> u32;
}

/// Classifies `ty`'s storage. Any kind abstract over instances (Protocol,
/// MultiProtocol, GenericVariable, LocalGenericVariable, Something,
/// Someobject) is always `Box`, optional or not. Otherwise: non-optional
/// types are `Simple`; optional types are `SimpleOptional` if they fit
/// within `MAX_SIMPLE_OPTIONAL_WORDS`, else `Box`.
#[must_use]
pub fn classify(ty: &Type, sizes: &dyn SizeOf) -> StorageType {
    if ty.kind.is_abstract_over_instances() {
        return StorageType::Box;
    }
    if matches!(ty.kind, TypeKind::Nothingness) {
        return StorageType::SimpleOptional;
    }
    if ty.flags.is_reference() {
        // References are always held through indirection regardless of
        // the pointee's own classification.
        return StorageType::Box;
    }
    if !ty.is_optional() {
        return StorageType::Simple;
    }
    if sizes.size_in_words(ty) <= MAX_SIMPLE_OPTIONAL_WORDS {
        StorageType::SimpleOptional
    } else {
        StorageType::Box
    }
}

/// Unboxing `from` into a `Simple` representation is legal only when both
/// sides classify identically under `Simple`/`SimpleOptional`; `glyphc`
/// never unboxes a `Box`-classified value. Boxing the other direction is
/// always legal provided the value isn't already held by reference.
#[must_use]
pub fn can_unbox(from: StorageType, to: StorageType) -> bool {
    matches!(
        (from, to),
        (StorageType::Simple, StorageType::Simple)
        | (StorageType::SimpleOptional, StorageType::SimpleOptional)
        | (StorageType::Simple, StorageType::SimpleOptional)
    )
}
