//! Subtype compatibility (`compatibleTo`) and structural identity
//! (`identicalTo`) — ordered rule cascade.

use crate::ids::{ClassId, ProtocolId};
use crate::kind::TypeKind;
use crate::substitution::resolve_on_super_arguments_and_constraints;
pub use crate::substitution::ConstraintLookup;
use crate::ty::{Type, TypeContext};

/// What `compatibleTo` needs to know about the type-definition graph that
/// `glyphc-types` itself doesn't store: class inheritance and protocol
/// adoption. `glyphc-typedefs` implements this against its arena; the unit
/// tests below use small hand-built fixtures.
pub trait InheritanceLookup: ConstraintLookup {
    /// `true` if `descendant` is `ancestor` or inherits from it transitively.
    fn class_inherits_from(&self, descendant: ClassId, ancestor: ClassId) -> bool;

    /// The protocols adopted directly or transitively by a class, already
    /// resolved onto that class's own generic arguments.
    fn adopted_protocols(&self, class: ClassId, arguments: &[Type]) -> Vec<Type>;
}

/// Where a candidate inferred for an unbound `LocalGenericVariable` is
/// recorded so a later common-type pass can reconcile multiple candidates.
pub trait InferenceSink {
    fn record_candidate(&mut self, function: crate::ids::FunctionId, index: u32, candidate: Type);
}

/// `a.compatible_to(b, ctx)`: may a value of type `a` flow where `b` is
/// expected? Rules are tried in declaration order below; the first that
/// applies wins.
pub fn compatible_to(
    a: &Type,
    b: &Type,
    ctx: &TypeContext,
    lookup: &dyn InheritanceLookup,
    inference: Option<&mut dyn InferenceSink>,
) -> bool {
    // The optional bit is a gate independent of kind: b may accept
    // optional; a may not be optional unless b is.
    if a.is_optional() && !b.is_optional() {
        return false;
    }

    // Rule 1: Something accepts everything.
    if matches!(b.kind, TypeKind::Something) {
        return true;
    }

    // Rule 2: Someobject accepts any object reference.
    if matches!(b.kind, TypeKind::Someobject)
    && matches!(
        a.kind,
        TypeKind::Class(..) | TypeKind::Protocol(..) | TypeKind::Someobject
    )
    {
        return true;
    }

    // Rule 4: Nothingness flows into any optional target or Nothingness.
    if matches!(a.kind, TypeKind::Nothingness) {
        return b.is_optional() || matches!(b.kind, TypeKind::Nothingness);
    }

    match (&a.kind, &b.kind) {
        // Rule 3, Class<->Class: inheritance plus invariant own arguments.
        (TypeKind::Class(a_id, a_args), TypeKind::Class(b_id, b_args)) => {
            lookup.class_inherits_from(*a_id, *b_id) && identical_to(a_args, b_args)
        }
        // Rule 3, Class->Protocol: some adopted (and resolved) protocol is
        // itself compatible to b.
        (TypeKind::Class(a_id, a_args), TypeKind::Protocol(..)) => lookup
            .adopted_protocols(*a_id, a_args)
            .iter()
            .any(|adopted| compatible_to(adopted, b, ctx, lookup, None)),
        // Rule 5: Callable<->Callable, covariant return, contravariant
        // parameters, matching arity.
        (
            TypeKind::Callable {
                return_type: a_ret,
                argument_types: a_args,
            },
            TypeKind::Callable {
                return_type: b_ret,
                argument_types: b_args,
            },
        ) => {
            a_args.len() == b_args.len()
            && compatible_to(a_ret, b_ret, ctx, lookup, None)
            && a_args
                .iter()
                .zip(b_args.iter())
                .all(|(a_param, b_param)| compatible_to(b_param, a_param, ctx, lookup, None))
        }
        // Rule 6: Error<->Error, same error enum, covariant wrapped type.
        (
            TypeKind::Error {
                error_enum: a_enum,
                wrapped: a_wrapped,
            },
            TypeKind::Error {
                error_enum: b_enum,
                wrapped: b_wrapped,
            },
        ) => a_enum == b_enum && compatible_to(a_wrapped, b_wrapped, ctx, lookup, None),
        // Rule 7, MultiProtocol targets: a must satisfy every constituent.
        (_, TypeKind::MultiProtocol(targets)) => targets
            .iter()
            .all(|target| compatible_to(a, target, ctx, lookup, None)),
        // Rule 7, MultiProtocol source: a's protocol set must be a superset
        // of b's requirement (b is a single protocol here by exclusion above).
        (TypeKind::MultiProtocol(sources), TypeKind::Protocol(..)) => sources
            .iter()
            .any(|source| compatible_to(source, b, ctx, lookup, None)),
        (TypeKind::Protocol(a_id, a_args), TypeKind::Protocol(b_id, b_args)) => {
            a_id == b_id && identical_to(a_args, b_args)
        }
        // Rule 8: generic variables resolve through super-arguments and
        // constraints, then retry once.
        (TypeKind::GenericVariable { .. }, _) | (_, TypeKind::GenericVariable { .. }) => {
            let a_resolved = resolve_on_super_arguments_and_constraints(a, ctx, lookup);
            let b_resolved = resolve_on_super_arguments_and_constraints(b, ctx, lookup);
            if a_resolved == *a && b_resolved == *b {
                false
            } else {
                compatible_to(&a_resolved, &b_resolved, ctx, lookup, inference)
            }
        }
        // Rule 9: an unbound LocalGenericVariable on the receiving side
        // accepts any argument and records it for later reconciliation.
        (_, TypeKind::LocalGenericVariable { index, function }) => {
            if let Some(sink) = inference {
                sink.record_candidate(*function, *index, a.clone());
                true
            } else {
                false
            }
        }
        (TypeKind::ValueType(a_id, a_args), TypeKind::ValueType(b_id, b_args)) => {
            a_id == b_id && identical_to(a_args, b_args)
        }
        (TypeKind::Enum(a_id), TypeKind::Enum(b_id)) => a_id == b_id,
        (TypeKind::SelfType, TypeKind::SelfType) => true,
        _ => false,
    }
}

/// Structural equality, used where variance is disallowed: class and
/// protocol generic arguments must compare identical, not merely
/// compatible.
#[must_use]
pub fn identical_to(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// A type is always compatible with itself; exposed standalone because
/// callers that don't care about inheritance rules hit it constantly.
#[must_use]
pub fn is_trivially_compatible(a: &Type, b: &Type) -> bool {
    a == b
}

/// Canonical single-protocol check `a.protocol_id == Some(id)` used by
/// boxing-layer synthesis to decide which vtable a concrete method's
/// adapter belongs in.
#[must_use]
pub fn protocol_id_of(ty: &Type) -> Option<ProtocolId> {
    match ty.kind {
        TypeKind::Protocol(id, _) => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::TypeFlags;
    use crate::ids::{ClassId, FunctionId};

    struct Fixture {
        inherits: Vec<(ClassId, ClassId)>,
    }

    impl ConstraintLookup for Fixture {
        fn constraint(&self, _owner: crate::ids::TypeDefRef, _index: u32) -> Option<Type> {
            None
        }
    }

    impl InheritanceLookup for Fixture {
        fn class_inherits_from(&self, descendant: ClassId, ancestor: ClassId) -> bool {
            descendant == ancestor || self.inherits.contains(&(descendant, ancestor))
        }
        fn adopted_protocols(&self, _class: ClassId, _arguments: &[Type]) -> Vec<Type> {
            vec![]
        }
    }

    #[test]
    fn something_accepts_anything() {
        let fixture = Fixture { inherits: vec![] };
        let ctx = TypeContext::empty();
        assert!(compatible_to(
            &Type::new(TypeKind::Class(ClassId(1), vec![]), TypeFlags::empty()),
            &Type::something(),
            &ctx,
            &fixture,
            None
        ));
    }

    #[test]
    fn class_compatible_to_ancestor_with_identical_arguments() {
        let base = ClassId(0);
        let derived = ClassId(1);
        let fixture = Fixture {
            inherits: vec![(derived, base)],
        };
        let ctx = TypeContext::empty();
        let a = Type::new(TypeKind::Class(derived, vec![]), TypeFlags::empty());
        let b = Type::new(TypeKind::Class(base, vec![]), TypeFlags::empty());
        assert!(compatible_to(&a, &b, &ctx, &fixture, None));
    }

    #[test]
    fn class_not_compatible_when_generic_arguments_differ() {
        let base = ClassId(0);
        let derived = ClassId(1);
        let fixture = Fixture {
            inherits: vec![(derived, base)],
        };
        let ctx = TypeContext::empty();
        let a = Type::new(TypeKind::Class(derived, vec![Type::something()]), TypeFlags::empty());
        let b = Type::new(TypeKind::Class(base, vec![Type::someobject()]), TypeFlags::empty());
        assert!(!compatible_to(&a, &b, &ctx, &fixture, None));
    }

    #[test]
    fn optional_gate_rejects_optional_source_for_non_optional_target() {
        let fixture = Fixture { inherits: vec![] };
        let ctx = TypeContext::empty();
        let a = Type::something().optional();
        let b = Type::something();
        assert!(!compatible_to(&a, &b, &ctx, &fixture, None));
    }

    #[test]
    fn nothingness_flows_into_optional_target_only() {
        let fixture = Fixture { inherits: vec![] };
        let ctx = TypeContext::empty();
        let target = Type::new(TypeKind::Class(ClassId(0), vec![]), TypeFlags::empty());
        assert!(!compatible_to(&Type::nothingness(), &target, &ctx, &fixture, None));
        assert!(compatible_to(
            &Type::nothingness(),
            &target.clone().optional(),
            &ctx,
            &fixture,
            None
        ));
    }

    #[test]
    fn callable_is_contravariant_in_parameters_and_covariant_in_return() {
        let ctx = TypeContext::empty();
        let base = ClassId(0);
        let derived = ClassId(1);
        let fixture = Fixture {
            inherits: vec![(derived, base)],
        };
        let a = Type::new(
            TypeKind::Callable {
                return_type: Box::new(Type::new(TypeKind::Class(derived, vec![]), TypeFlags::empty())),
                argument_types: vec![Type::new(TypeKind::Class(base, vec![]), TypeFlags::empty())],
            },
            TypeFlags::empty(),
        );
        let b = Type::new(
            TypeKind::Callable {
                return_type: Box::new(Type::new(TypeKind::Class(base, vec![]), TypeFlags::empty())),
                argument_types: vec![Type::new(TypeKind::Class(derived, vec![]), TypeFlags::empty())],
            },
            TypeFlags::empty(),
        );
        assert!(compatible_to(&a, &b, &ctx, &fixture, None));
    }

    struct RecordingSink {
        recorded: Vec<(FunctionId, u32, Type)>,
    }
    impl InferenceSink for RecordingSink {
        fn record_candidate(&mut self, function: FunctionId, index: u32, candidate: Type) {
            self.recorded.push((function, index, candidate));
        }
    }

    #[test]
    fn unbound_local_generic_variable_records_inference_candidate() {
        let fixture = Fixture { inherits: vec![] };
        let ctx = TypeContext::empty();
        let mut sink = RecordingSink { recorded: vec![] };
        let a = Type::something();
        let b = Type::new(
            TypeKind::LocalGenericVariable {
                index: 0,
                function: FunctionId(3),
            },
            TypeFlags::empty(),
        );
        assert!(compatible_to(&a, &b, &ctx, &fixture, Some(&mut sink)));
        assert_eq!(sink.recorded.len(), 1);
    }
}
