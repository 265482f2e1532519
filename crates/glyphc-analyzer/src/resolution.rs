//! Lookup surfaces a package loader (out of scope) would back: resolving a
//! method name against a receiver's type, and resolving the iterator
//! protocol a for-in's iterable type adopts when it isn't the built-in
//! list. Bundled with the call protocol's own generic-argument parser and
//! options into `Resolvers` so the expression dispatcher only grows one
//! parameter instead of three.

use glyphc_types::{FunctionId, Type};
use glyphc_typedefs::parser::TypeNameLookup;
use glyphc_typedefs::Function;

use crate::control_flow::IteratorProtocol;
use crate::options::AnalyzerOptions;
use crate::writer::Opcode;

/// Everything the function-call protocol needs beyond what it parses from
/// the token stream, already narrowed to one receiver/name pair: the
/// callee's signature, which instruction dispatches it, the vtable/protocol
/// slot a backend would invoke, and the receiver's own generic arguments.
pub struct MethodResolution {
    pub function: Function,
    pub callee_id: FunctionId,
    pub dispatch: Opcode,
    pub slot: u32,
    pub receiver_arguments: Vec<Type>,
}

/// Resolves a method name against a receiver's type. `None` means the
/// receiver's type has no such method — the caller turns that into a
/// `MethodNotFound`.
pub trait MethodLookup {
    fn resolve(&self, receiver: &Type, name: &str) -> Option<MethodResolution>;
}

/// Resolves a for-in iterable's element type and the three VTI slots
/// (`make-iterator`, `has-more`, `next`) its adopted enumerable protocol
/// assigns, for any iterable that isn't the built-in list.
pub trait IteratorProtocolLookup {
    fn resolve(&self, iterable: &Type) -> Option<(Type, IteratorProtocol)>;
}

/// The three lookups a method call or a for-in needs that aren't already
/// carried by `InheritanceLookup`/`SizeOf`, plus the call protocol's own
/// capacity options.
pub struct Resolvers<'a> {
    pub methods: &'a dyn MethodLookup,
    pub iterators: &'a dyn IteratorProtocolLookup,
    pub type_names: &'a dyn TypeNameLookup,
    pub options: AnalyzerOptions,
}
