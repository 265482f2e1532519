//! Type-definition finalization: generic-argument-count
//! biasing, instance-scope population, protocol-conformance checking plus
//! boxing-layer synthesis, required-initializer tracking, VTI assignment,
//! and override-signature checks. Everything here runs once per type
//! definition, after its own declaration has been fully parsed but before
//! any method body is analyzed against it.

use glyphc_common::{CompilerError, SourcePosition};
use glyphc_scopes::VariableId;
use glyphc_types::storage::classify;
use glyphc_types::{AccessLevel, ClassId, FunctionId, ProtocolId, Type, TypeContext, TypeDefRef, TypeKind};

use crate::arena::TypeDefinitionArena;
use crate::function::{Argument, Function, FunctionKind};
use crate::vti::ClassVtiProvider;

/// Shifts every `GenericVariable { owner,.. }` reference owned by `owner`
/// up by `bias`, leaving everything else untouched. Used once a class
/// learns its superclass's own generic-argument count: its own parameters,
/// which were numbered from zero while the class was being parsed in
/// isolation, must move after the inherited ones.
fn bias_generic_variables(ty: &Type, owner: TypeDefRef, bias: u32) -> Type {
    if bias == 0 {
        return ty.clone();
    }
    let kind = match &ty.kind {
        TypeKind::GenericVariable { index, owner: o } if *o == owner => TypeKind::GenericVariable {
            index: index + bias,
            owner: *o,
        },
        TypeKind::Class(id, args) => TypeKind::Class(*id, bias_all(args, owner, bias)),
        TypeKind::ValueType(id, args) => TypeKind::ValueType(*id, bias_all(args, owner, bias)),
        TypeKind::Protocol(id, args) => TypeKind::Protocol(*id, bias_all(args, owner, bias)),
        TypeKind::MultiProtocol(members) => TypeKind::MultiProtocol(bias_all(members, owner, bias)),
        TypeKind::Callable {
            return_type,
            argument_types,
        } => TypeKind::Callable {
            return_type: Box::new(bias_generic_variables(return_type, owner, bias)),
            argument_types: bias_all(argument_types, owner, bias),
        },
        TypeKind::Error { error_enum, wrapped } => TypeKind::Error {
            error_enum: *error_enum,
            wrapped: Box::new(bias_generic_variables(wrapped, owner, bias)),
        },
        other => other.clone(),
    };
    Type {
        kind,
        flags: ty.flags,
        box_identifier: ty.box_identifier,
    }
}

fn bias_all(types: &[Type], owner: TypeDefRef, bias: u32) -> Vec<Type> {
    types.iter().map(|t| bias_generic_variables(t, owner, bias)).collect()
}

fn bias_function_signature(function: &mut Function, owner: TypeDefRef, bias: u32) {
    function.return_type = bias_generic_variables(&function.return_type, owner, bias);
    for parameter in &mut function.parameters {
        parameter.declared_type = bias_generic_variables(&parameter.declared_type, owner, bias);
    }
    function.generic_constraints = bias_all(&function.generic_constraints, owner, bias);
}

/// Runs the full finalization sequence for one class. Must be called after
/// the superclass (if any) has already been finalized, since this class's
/// generic-argument count and VTI numbering both build on the superclass's.
pub fn finalize_class(arena: &mut TypeDefinitionArena, class: ClassId) -> Result<(), CompilerError> {
    if arena.class(class).finalized {
        return Ok(());
    }
    tracing::debug!(class = class.0, name = %arena.class(class).name, "finalizing class");

    let owner = TypeDefRef::Class(class);
    let superclass = arena.class(class).superclass;

    let (super_argument_count, super_vti_provider, super_required, super_instance_var_count) = match superclass {
        Some(sup) => {
            finalize_class(arena, sup)?;
            let s = arena.class(sup);
            (
                s.generic_argument_count,
                s.vti_provider,
                s.required_initializers.clone(),
                s.instance_variables.len() as u32,
            )
        }
        None => (0, ClassVtiProvider::root(), Default::default(), 0),
    };

    bias_own_generic_variables(arena, owner, super_argument_count);

    let def = arena.class_mut(class);
    def.generic_argument_count = super_argument_count + def.own_generic_parameter_count;

    renumber_instance_variables(&mut arena.class_mut(class).instance_variables, super_instance_var_count);

    assign_vtis(arena, class, super_vti_provider, superclass)?;

    finalize_required_initializers(arena, class, super_required)?;

    check_protocol_conformance(arena, class)?;

    arena.class_mut(class).finalized = true;
    tracing::trace!(class = class.0, "class finalized");
    Ok(())
}

fn bias_own_generic_variables(arena: &mut TypeDefinitionArena, owner: TypeDefRef, bias: u32) {
    if bias == 0 {
        return;
    }
    let TypeDefRef::Class(class) = owner else { return };
    let def = arena.class_mut(class);
    def.own_generic_constraints = bias_all(&def.own_generic_constraints, owner, bias);
    def.adopted_protocols = bias_all(&def.adopted_protocols, owner, bias);
    for (_, _, ty, _) in &mut def.instance_variables {
        *ty = bias_generic_variables(ty, owner, bias);
    }
    let function_ids: Vec<FunctionId> = def
        .methods
        .iter()
        .chain(def.class_methods.iter())
        .chain(def.initializers.iter())
        .copied()
        .collect();
    for id in function_ids {
        bias_function_signature(arena.function_mut(id), owner, bias);
    }
}

fn renumber_instance_variables(variables: &mut [(VariableId, String, Type, SourcePosition)], start: u32) {
    for (index, (id,..)) in variables.iter_mut().enumerate() {
        *id = VariableId(start + index as u32);
    }
}

fn assign_vtis(
    arena: &mut TypeDefinitionArena,
    class: ClassId,
    super_provider: ClassVtiProvider,
    superclass: Option<ClassId>,
) -> Result<(), CompilerError> {
    let mut provider = ClassVtiProvider::for_subclass_of(&super_provider);

    let method_ids = arena.class(class).methods.clone();
    for id in method_ids {
        let is_overriding = arena.function(id).is_overriding;
        let name = arena.function(id).name.clone();
        if is_overriding {
            let base = find_super_function(arena, superclass, &name, |f| f.kind == FunctionKind::ObjectMethod)
                .ok_or_else(|| CompilerError::ProtocolConformanceViolation {
                position: arena.function(id).declared_at.clone(),
                name: name.clone(),
            })?;
            let (base_final, base_vti) = {
                let base_fn = arena.function(base);
                (base_fn.is_final, base_fn.vti)
            };
            if base_final {
                return Err(CompilerError::AccessViolation {
                    position: arena.function(id).declared_at.clone(),
                    name,
                });
            }
            arena.function_mut(id).vti = base_vti;
        } else {
            let vti = provider.reserve_method();
            arena.function_mut(id).vti = Some(vti);
        }
    }

    let class_method_ids = arena.class(class).class_methods.clone();
    for id in class_method_ids {
        let vti = provider.reserve_class_method();
        arena.function_mut(id).vti = Some(vti);
    }

    let initializer_ids = arena.class(class).initializers.clone();
    for id in initializer_ids {
        let vti = provider.reserve_initializer();
        arena.function_mut(id).vti = Some(vti);
    }

    arena.class_mut(class).vti_provider = provider;
    Ok(())
}

fn find_super_function(
    arena: &TypeDefinitionArena,
    superclass: Option<ClassId>,
    name: &str,
    matches_kind: impl Fn(&Function) -> bool,
) -> Option<FunctionId> {
    let mut current = superclass;
    while let Some(id) = current {
        let def = arena.class(id);
        for &candidate in &def.methods {
            let f = arena.function(candidate);
            if f.name == name && matches_kind(f) {
                return Some(candidate);
            }
        }
        current = def.superclass;
    }
    None
}

fn finalize_required_initializers(
    arena: &mut TypeDefinitionArena,
    class: ClassId,
    inherited: rustc_hash::FxHashSet<String>,
) -> Result<(), CompilerError> {
    let mut required = inherited;

    let initializer_ids = arena.class(class).initializers.clone();
    for id in &initializer_ids {
        let f = arena.function(*id);
        if f.is_required_initializer {
            required.insert(f.name.clone());
        } else {
            required.remove(&f.name);
        }
    }

    let def = arena.class_mut(class);
    def.required_initializers = required;

    if def.is_final && !def.required_initializers.is_empty() {
        let missing = def.required_initializers.iter().next().cloned().unwrap_or_default();
        return Err(CompilerError::ProtocolConformanceViolation {
            position: def.declared_at.clone(),
            name: missing,
        });
    }
    Ok(())
}

/// For every adopted protocol, checks each of the protocol's methods has a
/// same-named, same-arity implementation in the class, and synthesizes a
/// `BoxingLayer` adapter when the adopter's storage representation doesn't
/// already match what the protocol's abstract dispatch expects.
fn check_protocol_conformance(arena: &mut TypeDefinitionArena, class: ClassId) -> Result<(), CompilerError> {
    let protocols: Vec<Type> = arena.class(class).adopted_protocols.clone();
    for protocol_type in protocols {
        let TypeKind::Protocol(protocol_id, arguments) = &protocol_type.kind else {
            continue;
        };
        let protocol_method_ids = arena.protocol(*protocol_id).methods.clone();
        let ctx = TypeContext::for_owner(TypeDefRef::Protocol(*protocol_id), arguments.clone());

        for protocol_method_id in protocol_method_ids {
            let protocol_method = arena.function(protocol_method_id).clone();
            let implementor = arena
                .class(class)
                .methods
                .iter()
                .copied()
                .find(|&id| arena.function(id).name == protocol_method.name);

            let Some(implementor_id) = implementor else {
                return Err(CompilerError::ProtocolConformanceViolation {
                    position: arena.class(class).declared_at.clone(),
                    name: protocol_method.name,
                });
            };

            if arena.function(implementor_id).parameters.len() != protocol_method.parameters.len() {
                return Err(CompilerError::ProtocolConformanceViolation {
                    position: arena.function(implementor_id).declared_at.clone(),
                    name: protocol_method.name,
                });
            }

            if needs_boxing_layer(arena, &protocol_method, implementor_id, &ctx) {
                synthesize_boxing_layer(arena, class, &protocol_method, implementor_id, protocol_id.clone());
            }
        }
    }
    Ok(())
}

fn needs_boxing_layer(
    arena: &TypeDefinitionArena,
    protocol_method: &Function,
    implementor_id: FunctionId,
    ctx: &TypeContext,
) -> bool {
    let implementor = arena.function(implementor_id);
    let expected_return = glyphc_types::substitution::resolve_on(&protocol_method.return_type, ctx, false);
    classify(&expected_return, arena) != classify(&implementor.return_type, arena)
    || protocol_method.parameters.iter().zip(&implementor.parameters).any(|(p, i)| {
        let expected = glyphc_types::substitution::resolve_on(&p.declared_type, ctx, false);
        classify(&expected, arena) != classify(&i.declared_type, arena)
    })
}

fn synthesize_boxing_layer(
    arena: &mut TypeDefinitionArena,
    class: ClassId,
    protocol_method: &Function,
    implementor_id: FunctionId,
    protocol_id: ProtocolId,
) {
    let implementor = arena.function(implementor_id).clone();
    let position = implementor.declared_at.clone();
    let mut layer = Function::new(
        format!("{}🔀{}", protocol_method.name, protocol_id.0),
        AccessLevel::Public,
        implementor
            .parameters
            .iter()
            .map(|p| Argument {
            name: p.name.clone(),
            declared_type: p.declared_type.clone(),
        })
            .collect(),
        implementor.return_type.clone(),
        Some(TypeDefRef::Class(class)),
        position,
        FunctionKind::BoxingLayer,
    );
    layer.native_link_index = None;
    let layer_id = arena.register_function(layer);
    arena.class_mut(class).methods.push(layer_id);
    let vti = arena.class_mut(class).vti_provider.reserve_method();
    arena.function_mut(layer_id).vti = Some(vti);
}

/// Value types have no superclass, no inherited required initializers, and
/// no overriding, so finalization is just count-fixing plus conformance.
pub fn finalize_value_type(arena: &mut TypeDefinitionArena, value_type: glyphc_types::ValueTypeId) -> Result<(), CompilerError> {
    if arena.value_type(value_type).finalized {
        return Ok(());
    }
    renumber_instance_variables(&mut arena.value_type_mut(value_type).instance_variables, 0);

    let mut provider = crate::vti::PureFunctionVtiProvider::new();
    let method_ids = arena.value_type(value_type).methods.clone();
    for id in method_ids {
        let vti = provider.reserve();
        arena.function_mut(id).vti = Some(vti);
    }
    let initializer_ids = arena.value_type(value_type).initializers.clone();
    for id in initializer_ids {
        let vti = provider.reserve();
        arena.function_mut(id).vti = Some(vti);
    }

    arena.value_type_mut(value_type).finalized = true;
    Ok(())
}
