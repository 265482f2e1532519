//! Substitution (`resolveOn`): replacing generic variables and `Self` with
//! concrete arguments from a `TypeContext`.

use rustc_hash::FxHashSet;

use crate::ids::TypeDefRef;
use crate::kind::TypeKind;
use crate::ty::{Type, TypeContext};

/// How far substitution is permitted to walk through the context. The
/// full form resolves generic variables all the way to concrete arguments
/// and resolves `Self`; the weaker form only walks through a super type's
/// supplied arguments and declared constraints, used while analyzing the
/// body of the defining type itself, where concrete arguments aren't known
/// yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResolutionDepth {
    Full { resolve_self: bool },
    SuperArgumentsAndConstraints,
}

/// Generic-constraint lookup a `SuperArgumentsAndConstraints` resolution
/// needs: for a given owner and parameter index, the declared upper bound.
/// `glyphc-typedefs` supplies a real implementation backed by its arena;
/// tests here use a trivial one that names no constraints.
pub trait ConstraintLookup {
    fn constraint(&self, owner: TypeDefRef, index: u32) -> Option<Type>;
}

pub struct NoConstraints;

impl ConstraintLookup for NoConstraints {
    fn constraint(&self, _owner: TypeDefRef, _index: u32) -> Option<Type> {
        None
    }
}

/// Replaces every `GenericVariable`/`LocalGenericVariable`/`SelfType` in
/// `ty`'s tree with its counterpart from `ctx`, recursing into generic
/// arguments. A fixpoint loop: a variable may resolve to another variable,
/// so resolution repeats until a non-variable kind is reached or a cycle
/// `T -> T` is detected, at which point the last-seen value is kept rather
/// than looping forever.
#[must_use]
pub fn resolve_on(ty: &Type, ctx: &TypeContext, resolve_self: bool) -> Type {
    resolve_with_depth(ty, ctx, ResolutionDepth::Full { resolve_self }, &NoConstraints)
}

/// The weaker form: resolves through `ctx`'s super-supplied arguments and
/// through declared generic constraints, never through the full concrete
/// argument list (there isn't one yet).
#[must_use]
pub fn resolve_on_super_arguments_and_constraints(
    ty: &Type,
    ctx: &TypeContext,
    constraints: &dyn ConstraintLookup,
) -> Type {
    resolve_with_depth(ty, ctx, ResolutionDepth::SuperArgumentsAndConstraints, constraints)
}

fn resolve_with_depth(
    ty: &Type,
    ctx: &TypeContext,
    depth: ResolutionDepth,
    constraints: &dyn ConstraintLookup,
) -> Type {
    let mut current = ty.clone();
    let mut seen = FxHashSet::default();
    loop {
        let next = step(&current, ctx, depth, constraints);
        if next == current {
            return next;
        }
        // Cycle guard: if we've already produced this exact tree before,
        // further stepping can't converge further.
        if !seen.insert(next.clone()) {
            return next;
        }
        current = next;
    }
}

fn step(ty: &Type, ctx: &TypeContext, depth: ResolutionDepth, constraints: &dyn ConstraintLookup) -> Type {
    let flags = ty.flags;
    let resolved_kind = match &ty.kind {
        TypeKind::GenericVariable { index, owner } => {
            return match depth {
                ResolutionDepth::Full { .. } => {
                    if ctx.owner == Some(*owner) {
                        ctx.owner_arguments
                            .get(*index as usize)
                            .cloned()
                            .map(|mut resolved| {
                            resolved.flags = merge_flags(resolved.flags, flags);
                            resolved
                        })
                            .unwrap_or_else(|| ty.clone())
                    } else {
                        ty.clone()
                    }
                }
                ResolutionDepth::SuperArgumentsAndConstraints => {
                    if let Some(super_arg) = super_argument(ctx, *owner, *index) {
                        let mut resolved = super_arg;
                        resolved.flags = merge_flags(resolved.flags, flags);
                        resolved
                    } else if let Some(mut bound) = constraints.constraint(*owner, *index) {
                        bound.flags = merge_flags(bound.flags, flags);
                        bound
                    } else {
                        ty.clone()
                    }
                }
            };
        }
        TypeKind::LocalGenericVariable { index, function } => {
            return match depth {
                ResolutionDepth::Full { .. } if ctx.function == Some(*function) => ctx
                    .function_arguments
                    .get(*index as usize)
                    .cloned()
                    .map(|mut resolved| {
                    resolved.flags = merge_flags(resolved.flags, flags);
                    resolved
                })
                    .unwrap_or_else(|| ty.clone()),
                _ => ty.clone(),
            };
        }
        TypeKind::SelfType => {
            return match depth {
                ResolutionDepth::Full { resolve_self: true } => ctx
                    .calling_type
                    .as_ref()
                    .map(|calling| {
                    let mut resolved = (**calling).clone();
                    resolved.flags = merge_flags(resolved.flags, flags);
                    resolved
                })
                    .unwrap_or_else(|| ty.clone()),
                _ => ty.clone(),
            };
        }
        TypeKind::Class(id, args) => TypeKind::Class(*id, resolve_args(args, ctx, depth, constraints)),
        TypeKind::ValueType(id, args) => TypeKind::ValueType(*id, resolve_args(args, ctx, depth, constraints)),
        TypeKind::Protocol(id, args) => TypeKind::Protocol(*id, resolve_args(args, ctx, depth, constraints)),
        TypeKind::MultiProtocol(members) => {
            TypeKind::MultiProtocol(resolve_args(members, ctx, depth, constraints))
        }
        TypeKind::Callable {
            return_type,
            argument_types,
        } => TypeKind::Callable {
            return_type: Box::new(resolve_with_depth(return_type, ctx, depth, constraints)),
            argument_types: resolve_args(argument_types, ctx, depth, constraints),
        },
        TypeKind::Error { error_enum, wrapped } => TypeKind::Error {
            error_enum: *error_enum,
            wrapped: Box::new(resolve_with_depth(wrapped, ctx, depth, constraints)),
        },
        TypeKind::Enum(_) | TypeKind::Something | TypeKind::Someobject | TypeKind::Nothingness => {
            return ty.clone();
        }
    };
    Type {
        kind: resolved_kind,
        flags,
        box_identifier: None,
    }
}

fn resolve_args(
    args: &[Type],
    ctx: &TypeContext,
    depth: ResolutionDepth,
    constraints: &dyn ConstraintLookup,
) -> Vec<Type> {
    args.iter()
        .map(|a| resolve_with_depth(a, ctx, depth, constraints))
        .collect()
}

/// Looks up a generic variable's value among the super-supplied arguments
/// recorded on the context, if any were recorded for this owner.
fn super_argument(ctx: &TypeContext, owner: TypeDefRef, index: u32) -> Option<Type> {
    if ctx.owner == Some(owner) {
        ctx.owner_arguments.get(index as usize).cloned()
    } else {
        None
    }
}

/// The outer optional/reference/mutable bits always win over whatever the
/// substituted value carried; `META` likewise follows the *occurrence*
/// being substituted, not the argument it resolves to.
fn merge_flags(_resolved: crate::flags::TypeFlags, outer: crate::flags::TypeFlags) -> crate::flags::TypeFlags {
    outer
}
