//! The boxing bridge: the minimal instruction sequence needed to
//! move a value from one storage classification to another — unboxing,
//! boxing, taking or copying out of a reference — inserted wherever an
//! expectation's storage classification disagrees with what was parsed.

use glyphc_common::{CompilerError, SourcePosition};
use glyphc_types::storage::StorageType;

/// A value type whose box payload would need more words than a box's
/// fixed inline buffer provides. Kept generous relative to
/// `MAX_SIMPLE_OPTIONAL_WORDS` (which bounds the *unboxed* inline case);
/// this bounds the boxed case instead.
pub const MAX_BOXABLE_WORDS: u32 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStep {
    Unbox,
    Box,
    SimpleToBox,
    BoxToSimpleOptional,
    ReferenceTake,
    ReferenceCopy,
}

/// Computes the bridge steps to move a value from `from` storage (held by
/// reference iff `from_is_reference`) to `to` storage (wanted by reference
/// iff `to_wants_reference`), given the value's unboxed size in words.
/// Returns them in application order. Errors when the source would need
/// boxing but is too large for a box's inline payload.
pub fn bridge(
    from: StorageType,
    to: StorageType,
    from_is_reference: bool,
    to_wants_reference: bool,
    size_in_words: u32,
    position: &SourcePosition,
) -> Result<Vec<BridgeStep>, CompilerError> {
    let mut steps = Vec::new();

    if from_is_reference && !to_wants_reference {
        steps.push(BridgeStep::ReferenceCopy);
    } else if !from_is_reference && to_wants_reference {
        steps.push(BridgeStep::ReferenceTake);
    }

    match (from, to) {
        (StorageType::Box, StorageType::Simple) => steps.push(BridgeStep::Unbox),
        (StorageType::Box, StorageType::SimpleOptional) => steps.push(BridgeStep::BoxToSimpleOptional),
        (StorageType::Simple | StorageType::SimpleOptional, StorageType::Box) => {
            if size_in_words > MAX_BOXABLE_WORDS {
                return Err(CompilerError::CapacityExceeded {
                    position: position.clone(),
                    what: "boxed value payload".to_string(),
                    count: size_in_words as usize,
                    limit: MAX_BOXABLE_WORDS as usize,
                });
            }
            steps.push(BridgeStep::SimpleToBox);
        }
        _ => {}
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePosition {
        SourcePosition::new("t.emoji", 1, 1)
    }

    #[test]
    fn same_storage_needs_no_steps() {
        let steps = bridge(StorageType::Simple, StorageType::Simple, false, false, 1, &pos()).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn boxing_a_simple_value_inserts_simple_to_box() {
        let steps = bridge(StorageType::Simple, StorageType::Box, false, false, 1, &pos()).unwrap();
        assert_eq!(steps, vec![BridgeStep::SimpleToBox]);
    }

    #[test]
    fn unboxing_inserts_unbox() {
        let steps = bridge(StorageType::Box, StorageType::Simple, false, false, 1, &pos()).unwrap();
        assert_eq!(steps, vec![BridgeStep::Unbox]);
    }

    #[test]
    fn oversized_box_payload_is_a_capacity_error() {
        let err = bridge(StorageType::Simple, StorageType::Box, false, false, 1000, &pos()).unwrap_err();
        assert!(matches!(err, CompilerError::CapacityExceeded { .. }));
    }

    #[test]
    fn wanting_a_reference_inserts_reference_take() {
        let steps = bridge(StorageType::Simple, StorageType::Simple, false, true, 1, &pos()).unwrap();
        assert_eq!(steps, vec![BridgeStep::ReferenceTake]);
    }
}
