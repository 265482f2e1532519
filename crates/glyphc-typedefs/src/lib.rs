//! Type-definition assembly: the declarative type parser and the
//! arena/finalization pipeline that turns parsed class/value-type/enum/
//! protocol declarations into a fully cross-referenced type-definition
//! graph, including the trait implementations `glyphc-types`
//! defers to the arena (`InheritanceLookup`, `ConstraintLookup`, `SizeOf`).

pub mod arena;
pub mod finalize;
pub mod function;
pub mod markers;
pub mod parser;
pub mod vti;

pub use arena::{
    ClassDefinition, EnumDefinition, Package, PackageId, ProtocolDefinition, TypeDefinitionArena, ValueTypeDefinition,
};
pub use finalize::{finalize_class, finalize_value_type};
pub use function::{Argument, Function, FunctionKind, Vti};
pub use parser::{parse_type, ParseContext, ResolvedTypeName, TypeDynamism, TypeNameLookup};
pub use vti::{ClassVtiProvider, PureFunctionVtiProvider};
