//! `CommonTypeFinder` (used by list/dictionary literal forms, and reused for
//! generic-argument inference in the function-call protocol's step 3):
//! reconciles a stream of
//! candidate types into one, widening towards `Something`/`Someobject`
//! rather than failing when no single common ancestor exists below those
//! tops.

use glyphc_types::compatibility::{compatible_to, InheritanceLookup};
use glyphc_types::{Type, TypeContext, TypeKind};

#[derive(Clone, Debug, Default)]
pub struct CommonTypeFinder {
    current: Option<Type>,
}

impl CommonTypeFinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one more candidate type into the running common type.
    pub fn update(&mut self, candidate: &Type, ctx: &TypeContext, lookup: &dyn InheritanceLookup) {
        let Some(current) = self.current.take() else {
            self.current = Some(candidate.clone());
            return;
        };

        self.current = Some(if compatible_to(candidate, &current, ctx, lookup, None) {
            current
            } else if compatible_to(&current, candidate, ctx, lookup, None) {
                candidate.clone()
            } else {
                widen(&current, candidate)
        });
    }

    /// The reconciled type, or `None` if no candidate was ever seen (an
    /// empty literal with no expectation; the caller decides the fallback).
    #[must_use]
    pub fn finalize(self) -> Option<Type> {
        self.current
    }
}

/// Widens two mutually-incompatible candidates to the narrowest shared top:
/// `Someobject` if both are object references, `Something` otherwise.
fn widen(a: &Type, b: &Type) -> Type {
    let both_objects = is_object_reference(a) && is_object_reference(b);
    if both_objects {
        Type::someobject()
    } else {
        Type::something()
    }
}

fn is_object_reference(ty: &Type) -> bool {
    matches!(
        ty.kind,
        TypeKind::Class(..) | TypeKind::Protocol(..) | TypeKind::MultiProtocol(_) | TypeKind::Someobject
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphc_types::{ClassId, TypeFlags};

    struct NoInheritance;
    impl glyphc_types::substitution::ConstraintLookup for NoInheritance {
        fn constraint(&self, _owner: glyphc_types::TypeDefRef, _index: u32) -> Option<Type> {
            None
        }
    }
    impl InheritanceLookup for NoInheritance {
        fn class_inherits_from(&self, descendant: ClassId, ancestor: ClassId) -> bool {
            descendant == ancestor
        }
        fn adopted_protocols(&self, _class: ClassId, _arguments: &[Type]) -> Vec<Type> {
            vec![]
        }
    }

    #[test]
    fn single_candidate_is_the_result() {
        let mut finder = CommonTypeFinder::new();
        finder.update(&Type::something(), &TypeContext::empty(), &NoInheritance);
        assert_eq!(finder.finalize(), Some(Type::something()));
    }

    #[test]
    fn unrelated_classes_widen_to_someobject() {
        let mut finder = CommonTypeFinder::new();
        let a = Type::new(TypeKind::Class(ClassId(0), vec![]), TypeFlags::empty());
        let b = Type::new(TypeKind::Class(ClassId(1), vec![]), TypeFlags::empty());
        finder.update(&a, &TypeContext::empty(), &NoInheritance);
        finder.update(&b, &TypeContext::empty(), &NoInheritance);
        assert_eq!(finder.finalize(), Some(Type::someobject()));
    }

    #[test]
    fn no_candidates_finalizes_to_none() {
        assert_eq!(CommonTypeFinder::new().finalize(), None);
    }
}
