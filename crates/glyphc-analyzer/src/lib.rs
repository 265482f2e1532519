//! Single-pass expression/statement analyzer, function-call machinery, and
//! boxing-layer synthesis.
//!
//! This crate consumes a token stream and a package's already-finalized
//! type definitions (`glyphc-typedefs`) and produces, per function, a
//! fixed-width instruction stream (`writer::Writer`) ready for a code
//! generator that lives outside this workspace.

pub mod boxing_bridge;
pub mod boxing_layer;
pub mod calls;
pub mod common_type;
pub mod compile;
pub mod context;
pub mod control_flow;
pub mod dispatch;
pub mod expectation;
pub mod options;
pub mod recompile;
pub mod reporter;
pub mod resolution;
pub mod writer;

pub use boxing_bridge::{bridge, BridgeStep, MAX_BOXABLE_WORDS};
pub use calls::{analyze_call, class_is_subtype, CallSite, GENERIC_ARGUMENT_MARKER};
pub use common_type::CommonTypeFinder;
pub use compile::{compile_function, drain_pending_functions, CompiledFunction, PendingFunction};
pub use context::{AnalyzerContext, AnalyzerStatus};
pub use control_flow::{
    analyze_conditional, analyze_for_in_list, analyze_foreach, analyze_repeat_while, analyze_while, IteratorProtocol,
};
pub use dispatch::{analyze_expression, PrimitiveTypes};
pub use expectation::{InferenceFinder, TypeExpectation};
pub use options::AnalyzerOptions;
pub use recompile::{RecompilationPoint, RewindableTokenStream};
pub use reporter::Reporter;
pub use resolution::{IteratorProtocolLookup, MethodLookup, MethodResolution, Resolvers};
pub use writer::{Opcode, StringPool, Writer};
