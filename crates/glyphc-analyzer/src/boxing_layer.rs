//! Boxing-layer synthesis: when a class adopts a protocol whose
//! method signature is wider (more boxed) than the concrete method the
//! class implements, a small adapter function is built mechanically rather
//! than parsed from source, and installed into the protocol's slot in the
//! class's dispatch table in place of the concrete method.
//!
//! This module only plans and writes the adapter body; deciding *whether*
//! one is needed (comparing the concrete method's and the protocol slot's
//! parameter/return storage) is `glyphc-typedefs::finalize`'s job during
//! conformance checking — by the time a `BoxingLayerPlan` is built here,
//! that comparison has already happened.

use glyphc_common::SourcePosition;
use glyphc_types::storage::{classify, SizeOf};
use glyphc_types::Type;

use crate::boxing_bridge::{bridge, BridgeStep};
use crate::writer::{Opcode, Writer};

/// One parameter's adaptation: the protocol slot's declared (wide) type and
/// the concrete method's declared (narrow, or equally wide) type for the
/// same position.
pub struct ParameterAdaptation {
    pub protocol_type: Type,
    pub concrete_type: Type,
}

/// Everything needed to synthesize one boxing layer: its parameter
/// adaptations in order, the return-type adaptation, and the instruction
/// that dispatches to the concrete implementation once arguments are
/// narrowed.
pub struct BoxingLayerPlan {
    pub parameters: Vec<ParameterAdaptation>,
    pub protocol_return: Type,
    pub concrete_return: Type,
    pub concrete_dispatch: Opcode,
    pub concrete_slot: u32,
}

/// Builds the adapter body: for each parameter, a take-from-argument-slot
/// instruction followed by whatever bridge steps narrow it from the
/// protocol's storage to the concrete method's; then the concrete
/// dispatch; then the bridge steps that widen the result back out, and a
/// `Return`.
pub fn synthesize(plan: &BoxingLayerPlan, sizes: &dyn SizeOf, position: &SourcePosition) -> Result<Writer, glyphc_common::CompilerError> {
    let mut writer = Writer::new();

    for (index, parameter) in plan.parameters.iter().enumerate() {
        let take = match classify(&parameter.protocol_type, sizes) {
            glyphc_types::StorageType::Box => Opcode::ProduceWithObjectDestination,
            glyphc_types::StorageType::SimpleOptional => Opcode::ProduceWithVtDestination,
            glyphc_types::StorageType::Simple => Opcode::ProduceWithStackDestination,
        };
        writer.write_instruction(take);
        writer.write_word(index as u32);

        let from = classify(&parameter.protocol_type, sizes);
        let to = classify(&parameter.concrete_type, sizes);
        let size = sizes.size_in_words(&parameter.protocol_type);
        let steps = bridge(
            from,
            to,
            parameter.protocol_type.flags.is_reference(),
            parameter.concrete_type.flags.is_reference(),
            size,
            position,
        )?;
        write_bridge_steps(&mut writer, &steps);
    }

    writer.write_instruction(plan.concrete_dispatch);
    writer.write_word(plan.concrete_slot);

    let from = classify(&plan.concrete_return, sizes);
    let to = classify(&plan.protocol_return, sizes);
    let size = sizes.size_in_words(&plan.concrete_return);
    let return_steps = bridge(
        from,
        to,
        plan.concrete_return.flags.is_reference(),
        plan.protocol_return.flags.is_reference(),
        size,
        position,
    )?;
    write_bridge_steps(&mut writer, &return_steps);

    writer.write_instruction(Opcode::Return);
    Ok(writer)
}

fn write_bridge_steps(writer: &mut Writer, steps: &[BridgeStep]) {
    for step in steps {
        writer.write_instruction(match step {
            BridgeStep::Unbox => Opcode::Unbox,
            BridgeStep::Box | BridgeStep::SimpleToBox => Opcode::SimpleOptionalToBox,
            BridgeStep::BoxToSimpleOptional => Opcode::BoxToSimpleOptional,
            BridgeStep::ReferenceTake | BridgeStep::ReferenceCopy => Opcode::CopySingle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphc_types::{TypeFlags, TypeKind, ValueTypeId};

    struct FixedSize(u32);
    impl SizeOf for FixedSize {
        fn size_in_words(&self, _ty: &Type) -> u32 {
            self.0
        }
    }

    fn boxed(id: u32) -> Type {
        // Generic variable stands in for any abstract-over-instances kind,
        // which always classifies as Box regardless of declared size.
        Type::new(TypeKind::GenericVariable { index: 0, owner: glyphc_types::TypeDefRef::Class(glyphc_types::ClassId(id)) }, TypeFlags::empty())
    }

    fn simple() -> Type {
        Type::new(TypeKind::ValueType(ValueTypeId(1), vec![]), TypeFlags::empty())
    }

    #[test]
    fn unboxing_parameter_adaptation_inserts_an_unbox_step() {
        let plan = BoxingLayerPlan {
            parameters: vec![ParameterAdaptation {
                protocol_type: boxed(0),
                concrete_type: simple(),
            }],
            protocol_return: Type::nothingness(),
            concrete_return: Type::nothingness(),
            concrete_dispatch: Opcode::DispatchMethod,
            concrete_slot: 5,
        };
        let writer = synthesize(&plan, &FixedSize(1), &SourcePosition::new("t.emoji", 1, 1)).unwrap();
        assert!(writer.words().contains(&(Opcode::Unbox as u32)));
        assert!(writer.words().contains(&(Opcode::DispatchMethod as u32)));
        assert_eq!(*writer.words().last().unwrap(), Opcode::Return as u32);
    }

    #[test]
    fn matching_storage_needs_no_bridge_steps_between_take_and_dispatch() {
        let plan = BoxingLayerPlan {
            parameters: vec![ParameterAdaptation {
                protocol_type: simple(),
                concrete_type: simple(),
            }],
            protocol_return: simple(),
            concrete_return: simple(),
            concrete_dispatch: Opcode::DispatchMethod,
            concrete_slot: 0,
        };
        let writer = synthesize(&plan, &FixedSize(1), &SourcePosition::new("t.emoji", 1, 1)).unwrap();
        // take, dispatch+slot, return: no unbox/box/copy steps inserted.
        assert_eq!(writer.words().len(), 5);
    }
}
