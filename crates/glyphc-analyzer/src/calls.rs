//! Function-call protocol: generic-argument parsing or inference,
//! per-parameter expectation-driven argument parsing, inference
//! finalization and re-verification, access-level enforcement, and the
//! substituted return type.

use glyphc_common::{CompilerError, SourcePosition, TokenStream};
use glyphc_types::compatibility::{compatible_to, InheritanceLookup};
use glyphc_types::storage::SizeOf;
use glyphc_types::{ClassId, FunctionId, Type, TypeContext, TypeDefRef};
use glyphc_typedefs::parser::{parse_type, ParseContext, TypeDynamism};
use glyphc_typedefs::Function;

use crate::context::AnalyzerContext;
use crate::dispatch::PrimitiveTypes;
use crate::expectation::{InferenceFinder, TypeExpectation};
use crate::resolution::Resolvers;
use crate::writer::Opcode;

pub const GENERIC_ARGUMENT_MARKER: &str = "🐋";

/// Everything a call site must supply beyond what's parsed from the token
/// stream: the callee's signature, which instruction dispatches it (plain
/// method, type-method, protocol, or callable-execute), the vtable/protocol
/// slot a backend should invoke, the caller's own enclosing type
/// definition (for access checks), and the receiver's own generic
/// arguments (for resolving the callee's owner-generic parameter types).
pub struct CallSite<'a> {
    pub callee: &'a Function,
    pub callee_id: FunctionId,
    pub dispatch: Opcode,
    pub slot: u32,
    pub caller_owner: Option<TypeDefRef>,
    pub receiver_arguments: Vec<Type>,
}

/// Emitted last of all: the dispatch instruction plus the resolved slot,
/// after every argument has been parsed and pushed.
fn emit_dispatch(ctx: &mut AnalyzerContext, site: &CallSite) {
    ctx.writer.write_instruction(site.dispatch);
    ctx.writer.write_word(site.slot);
}

/// Runs the five-step function-call protocol and returns the substituted
/// result type. `is_subtype` backs access-level rule 4 (protected access
/// from a subclass of the owner).
pub fn analyze_call(
    stream: &mut dyn TokenStream,
    ctx: &mut AnalyzerContext,
    primitives: PrimitiveTypes,
    lookup: &dyn InheritanceLookup,
    sizes: &dyn SizeOf,
    resolvers: &Resolvers,
    site: &CallSite,
    is_subtype: impl Fn(TypeDefRef, TypeDefRef) -> bool,
    position: &SourcePosition,
) -> Result<Type, CompilerError> {
    let options = resolvers.options;
    // Step 1: explicit generic arguments, or inference finders if none were
    // given and the callee has generic parameters of its own.
    let mut explicit_arguments = Vec::new();
    while stream.consume_token_if(GENERIC_ARGUMENT_MARKER) {
        if explicit_arguments.len() >= options.max_generic_arguments {
            return Err(CompilerError::CapacityExceeded {
                position: position.clone(),
                what: "generic arguments".to_string(),
                count: explicit_arguments.len() + 1,
                limit: options.max_generic_arguments,
            });
        }
        // A call's own explicit generic arguments may reference the caller's
        // generic variables but never `Self` — there's no receiver type to
        // resolve it against at this position.
        let argument_dynamism = ctx.dynamism.difference(TypeDynamism::SELF);
        explicit_arguments.push(parse_type(stream, resolvers.type_names, argument_dynamism, ParseContext::default(), None)?);
    }
    let inferring = explicit_arguments.is_empty() && !site.callee.generic_constraints.is_empty();
    let mut finders: Vec<InferenceFinder> = if inferring {
        (0..site.callee.generic_constraints.len())
            .map(|index| InferenceFinder::new(site.callee_id, index as u32))
            .collect()
    } else {
        Vec::new()
    };

    let placeholder_arguments: Vec<Type> = if inferring {
        std::iter::repeat(Type::something()).take(site.callee.generic_constraints.len()).collect()
    } else {
        explicit_arguments.clone()
    };

    let owner_context = site
        .callee
        .owner
        .map(|owner| TypeContext::for_owner(owner, site.receiver_arguments.clone()))
        .unwrap_or_default();
    let mut call_context = owner_context.with_function(site.callee_id, placeholder_arguments);

    // Step 2: parse each argument expecting the callee's declared
    // parameter type, substituted against the (possibly still-inferring)
    // call context.
    let mut argument_types = Vec::with_capacity(site.callee.parameters.len());
    for (index, parameter) in site.callee.parameters.iter().enumerate() {
        let resolved_parameter = glyphc_types::substitution::resolve_on(&parameter.declared_type, &call_context, true);
        let mut expectation = TypeExpectation::of(resolved_parameter.clone());
        expectation.inference_finders = finders.clone();
        let argument_type = crate::dispatch::analyze_expression(stream, ctx, primitives, lookup, sizes, resolvers, &expectation)?;

        if inferring {
            if let glyphc_types::TypeKind::LocalGenericVariable { index: local_index, function } = &parameter.declared_type.kind {
                if *function == site.callee_id {
                    finders[*local_index as usize].record(argument_type.clone());
                }
            }
        } else if !compatible_to(&argument_type, &resolved_parameter, &call_context, lookup, None) {
            return Err(CompilerError::IncompatibleArgument {
                position: position.clone(),
                index,
                expected: format!("{resolved_parameter:?}"),
                found: format!("{argument_type:?}"),
            });
        }
        argument_types.push(argument_type);
    }

    // Step 3: finalize inference and re-verify.
    if inferring {
        let mut finalized = Vec::with_capacity(finders.len());
        for (index, finder) in finders.into_iter().enumerate() {
            let mut common = crate::common_type::CommonTypeFinder::new();
            for candidate in &finder.candidates {
                common.update(candidate, &call_context, lookup);
            }
            let resolved = common.finalize().unwrap_or_else(Type::something);
            if let Some(constraint) = site.callee.generic_constraints.get(index) {
                if !compatible_to(&resolved, constraint, &call_context, lookup, None) {
                    return Err(CompilerError::GenericConstraintViolation {
                        position: position.clone(),
                        index,
                    });
                }
            }
            finalized.push(resolved);
        }
        call_context = call_context.with_function(site.callee_id, finalized);

        for (index, (parameter, argument_type)) in site.callee.parameters.iter().zip(argument_types.iter()).enumerate() {
            let resolved_parameter = glyphc_types::substitution::resolve_on(&parameter.declared_type, &call_context, true);
            if !compatible_to(argument_type, &resolved_parameter, &call_context, lookup, None) {
                return Err(CompilerError::IncompatibleArgument {
                    position: position.clone(),
                    index,
                    expected: format!("{resolved_parameter:?}"),
                    found: format!("{argument_type:?}"),
                });
            }
        }
    }

    // Step 4: access enforcement.
    if let Some(owner) = site.callee.owner {
        if !site.callee.access_level.permits(owner, site.caller_owner, &is_subtype) {
            return Err(CompilerError::AccessViolation {
                position: position.clone(),
                name: site.callee.name.clone(),
            });
        }
    }

    emit_dispatch(ctx, site);

    // Step 5: result type, substituted against the final context.
    Ok(glyphc_types::substitution::resolve_on(&site.callee.return_type, &call_context, true))
}

/// A trivial `is_subtype` closure usable when the caller has no inheritance
/// information at hand beyond class inheritance (protocols/value types
/// never subclass, so only the `Class`/`Class` pair can ever be true).
pub fn class_is_subtype(lookup: &dyn InheritanceLookup) -> impl Fn(TypeDefRef, TypeDefRef) -> bool + '_ {
    move |caller, owner| match (caller, owner) {
        (TypeDefRef::Class(caller), TypeDefRef::Class(owner)) => lookup.class_inherits_from(caller, owner),
        _ => false,
    }
}
